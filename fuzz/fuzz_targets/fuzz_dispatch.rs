#![no_main]

use libfuzzer_sys::fuzz_target;

use std::net::Ipv4Addr;

use domain::common::entity::Ipv4Cidr;
use domain::dispatch::compiler::DispatchCompiler;
use domain::dispatch::entity::{
    DispatchRequest, EdgeSpec, FixedResponse, MatchKind, Resolution, ServiceEndpoint,
};
use domain::zone::entity::{Topology, Zone, ZoneTier};

// Build an edge from fuzz data, compile it and resolve requests against it.
//
// Layout:
//   [0]    = selector (0=host, 1=header)
//   rest   = 3-byte entry chunks (key byte, port hi, port lo); a trailing
//            remainder becomes the probe key
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let match_kind = if data[0] % 2 == 0 {
        MatchKind::Host
    } else {
        MatchKind::routing_header()
    };
    let Ok(block) = Ipv4Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 24) else {
        return;
    };
    let topology = Topology::new(vec![Zone::new("app", block, ZoneTier::Private)]);

    let mut edge = EdgeSpec::new("edge", match_kind.clone(), "10.0.0.10", 443);
    let mut chunks = data[1..].chunks_exact(3);
    for chunk in &mut chunks {
        let port = u16::from_be_bytes([chunk[1], chunk[2]]);
        edge = edge.with_entry(
            format!("svc-{}", chunk[0] % 32),
            ServiceEndpoint::new(format!("svc-{}", chunk[0]), "app", port),
        );
    }
    let probe = String::from_utf8_lossy(chunks.remainder()).into_owned();

    let Ok(table) = DispatchCompiler::compile(&edge, &topology) else {
        return;
    };

    // Priorities are exactly 1..=n.
    for (i, rule) in table.rules.iter().enumerate() {
        assert_eq!(rule.priority as usize, i + 1);
    }

    let request = match match_kind {
        MatchKind::Host => DispatchRequest::for_host(probe),
        MatchKind::Header { ref name } => DispatchRequest::default().with_header(name.clone(), probe),
    };
    match table.resolve(&request) {
        Resolution::Forward { priority, target } => {
            assert!(priority >= 1 && priority as usize <= table.rules.len());
            assert_eq!(table.rules[priority as usize - 1].target, *target);
        }
        Resolution::Fallback(response) => assert_eq!(*response, FixedResponse::not_found()),
    }
});
