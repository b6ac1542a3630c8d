//! Deterministic plan fingerprinting derived from the explain projection.
#![allow(clippy::cast_possible_truncation)]

use crate::{
    explain::{ExplainAccess, ExplainInversion, ExplainPlan, ExplainStream},
    optimizer::JoinPlan,
    retrieval::ScanKind,
};
use sha2::{Digest, Sha256};

///
/// PlanFingerprint
///
/// Stable, deterministic fingerprint for join plans. Two plans with the same
/// stream order and access shapes share a fingerprint regardless of cost.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PlanFingerprint([u8; 32]);

impl PlanFingerprint {
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn as_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            use std::fmt::Write as _;
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl std::fmt::Display for PlanFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_hex())
    }
}

impl JoinPlan {
    /// Compute a stable fingerprint for this join plan.
    #[must_use]
    pub fn fingerprint(&self) -> PlanFingerprint {
        self.explain().fingerprint()
    }
}

impl ExplainPlan {
    #[must_use]
    pub fn fingerprint(&self) -> PlanFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(b"planfp:v1");
        hash_explain_plan(&mut hasher, self);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        PlanFingerprint(out)
    }
}

fn hash_explain_plan(hasher: &mut Sha256, plan: &ExplainPlan) {
    write_tag(hasher, 0x01);
    write_u32(hasher, plan.rivers.len() as u32);

    for river in &plan.rivers {
        write_tag(hasher, 0x02);
        write_u32(hasher, river.streams.len() as u32);
        for stream in &river.streams {
            hash_stream(hasher, stream);
        }
    }
}

fn hash_stream(hasher: &mut Sha256, stream: &ExplainStream) {
    write_tag(hasher, 0x03);
    write_u32(hasher, u32::from(stream.stream.get()));
    write_str(hasher, &stream.alias);
    write_tag(hasher, u8::from(stream.guarded));

    match &stream.access {
        ExplainAccess::Natural => write_tag(hasher, 0x10),
        ExplainAccess::Index(inversion) => {
            write_tag(hasher, 0x11);
            hash_inversion(hasher, inversion);
        }
        ExplainAccess::Order {
            navigation,
            inversion,
        } => {
            write_tag(hasher, 0x12);
            write_str(hasher, navigation);
            match inversion {
                Some(inversion) => {
                    write_tag(hasher, 0x01);
                    hash_inversion(hasher, inversion);
                }
                None => write_tag(hasher, 0x00),
            }
        }
    }
}

fn hash_inversion(hasher: &mut Sha256, inversion: &ExplainInversion) {
    match inversion {
        ExplainInversion::Index {
            name,
            scan_kind,
            lower,
            upper,
        } => {
            write_tag(hasher, 0x20);
            write_str(hasher, name);
            write_tag(hasher, scan_kind_tag(*scan_kind));
            write_u32(hasher, *lower as u32);
            write_u32(hasher, *upper as u32);
        }
        ExplainInversion::InList { name, values } => {
            write_tag(hasher, 0x21);
            write_str(hasher, name);
            write_u32(hasher, *values as u32);
        }
        ExplainInversion::DbKey { lower, upper } => {
            write_tag(hasher, 0x22);
            write_tag(hasher, u8::from(*lower));
            write_tag(hasher, u8::from(*upper));
        }
        ExplainInversion::And(children) => {
            write_tag(hasher, 0x23);
            write_u32(hasher, children.len() as u32);
            for child in children {
                hash_inversion(hasher, child);
            }
        }
        ExplainInversion::Or(children) => {
            write_tag(hasher, 0x24);
            write_u32(hasher, children.len() as u32);
            for child in children {
                hash_inversion(hasher, child);
            }
        }
    }
}

const fn scan_kind_tag(kind: ScanKind) -> u8 {
    match kind {
        ScanKind::None => 0x30,
        ScanKind::Equal => 0x31,
        ScanKind::Equivalent => 0x32,
        ScanKind::Missing => 0x33,
        ScanKind::Starting => 0x34,
        ScanKind::Less => 0x35,
        ScanKind::Greater => 0x36,
        ScanKind::Between => 0x37,
    }
}

fn write_tag(hasher: &mut Sha256, tag: u8) {
    hasher.update([tag]);
}

fn write_u32(hasher: &mut Sha256, value: u32) {
    hasher.update(value.to_be_bytes());
}

fn write_str(hasher: &mut Sha256, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::Operand,
        model::{StreamDescriptor, StreamId, StreamSet},
        optimizer::Optimizer,
        test_fixtures::{A, B, Fixture, field, int_index},
    };

    fn fixture(cardinality: f64) -> Fixture {
        let mut fx = Fixture::new();
        fx.add_stream(
            StreamDescriptor::new(A, "A", cardinality).with_index(int_index(2, "A_X", &[1])),
        );
        fx.add_stream(StreamDescriptor::new(B, "B", 10.0));
        let x = fx.arena.eq(field(A, 1), Operand::int(1));
        fx.filter([x]);

        fx
    }

    fn plan(fx: &Fixture, streams: &[StreamId]) -> JoinPlan {
        let mut conjuncts = fx.conjuncts.clone();

        Optimizer::new(&fx.arena, &fx.catalog, &fx.config)
            .plan_inner_join(&mut conjuncts, streams, StreamSet::EMPTY, None)
            .expect("plan should succeed")
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let fx = fixture(1_000.0);

        let first = plan(&fx, &[A]).fingerprint();
        let second = plan(&fx, &[A]).fingerprint();

        assert_eq!(first, second);
        assert_eq!(first.as_hex().len(), 64);
        assert_eq!(first.to_string(), first.as_hex());
    }

    #[test]
    fn fingerprint_ignores_cost_but_tracks_shape() {
        let small = plan(&fixture(1_000.0), &[A]);
        let large = plan(&fixture(50_000.0), &[A]);
        assert!(small.cost() < large.cost());
        assert_eq!(small.fingerprint(), large.fingerprint());

        let fx = fixture(1_000.0);
        let mut natural = plan(&fx, &[A]).explain();
        natural.rivers[0].streams[0].access = ExplainAccess::Natural;
        assert_ne!(natural.fingerprint(), plan(&fx, &[A]).fingerprint());
    }

    #[test]
    fn fingerprint_tracks_stream_order() {
        let fx = fixture(1_000.0);
        let explain = plan(&fx, &[A, B]).explain();

        let mut reversed = explain.clone();
        reversed.rivers.reverse();

        assert_eq!(explain.rivers.len(), 2);
        assert_ne!(explain.fingerprint(), reversed.fingerprint());
    }
}
