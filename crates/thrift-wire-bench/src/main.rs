//! Benchmark for Thrift binary encoding and decoding.
//!
//! Builds a synthetic batch of user records, then times encoding, eager
//! decoding, lazy decoding, and skipping over the same bytes.

use std::fs;
use std::time::{Duration, Instant};

use serde::Serialize;
use thrift_wire::codec::{list_pool_stats, map_pool_stats};
use thrift_wire::{
    encode_value, DecodeOptions, Decoder, Struct, StructBuilder, Type, ValueList, WireValue,
};

const ITERS: u32 = 10;

// =============================================================================
// PAYLOAD
// =============================================================================

fn build_user(i: i64) -> Struct {
    StructBuilder::new()
        .i64(1, i)
        .string(2, format!("user-{i:06}"))
        .string(3, format!("user{i}@example.com"))
        .bool(4, i % 3 == 0)
        .double(5, i as f64 * 0.25)
        .list(6, Type::Binary, |tags| {
            (0..(i % 5)).fold(tags, |tags, t| tags.string(format!("tag-{t}")))
        })
        .map(
            7,
            Type::I16,
            Type::I64,
            (0..4i16).map(|k| (WireValue::I16(k), WireValue::I64(i * 10 + k as i64))),
        )
        .structure(8, |address| {
            address
                .string(1, "1 Main St")
                .string(2, "Springfield")
                .i32(3, (i % 90_000) as i32 + 10_000)
        })
        .build()
}

fn build_batch(count: usize) -> WireValue {
    let users = (0..count as i64).map(|i| WireValue::Struct(build_user(i))).collect();
    WireValue::Struct(
        StructBuilder::new()
            .string(1, "users")
            .field(2, WireValue::list(Type::Struct, users))
            .build(),
    )
}

// =============================================================================
// REPORT
// =============================================================================

#[derive(Debug, Serialize)]
struct Measurement {
    name: &'static str,
    avg_micros: f64,
    throughput_mb_s: f64,
}

#[derive(Debug, Serialize)]
struct PoolReport {
    created: u64,
    reused: u64,
    idle: usize,
}

#[derive(Debug, Serialize)]
struct Report {
    records: usize,
    encoded_bytes: usize,
    iterations: u32,
    measurements: Vec<Measurement>,
    list_pool: PoolReport,
    map_pool: PoolReport,
}

fn measure<F: FnMut()>(name: &'static str, bytes: usize, mut f: F) -> Measurement {
    // Warmup
    for _ in 0..3 {
        f();
    }
    let start = Instant::now();
    for _ in 0..ITERS {
        f();
    }
    let avg: Duration = start.elapsed() / ITERS;
    let m = Measurement {
        name,
        avg_micros: avg.as_secs_f64() * 1e6,
        throughput_mb_s: (bytes as f64 / 1_000_000.0) / avg.as_secs_f64(),
    };
    println!("{:<24} {:>12.1} µs  {:>10.2} MB/s", m.name, m.avg_micros, m.throughput_mb_s);
    m
}

fn main() {
    let mut args = std::env::args().skip(1);
    let records: usize = args
        .next()
        .map(|s| s.parse().expect("record count must be a number"))
        .unwrap_or(50_000);
    let report_path = args.next();

    println!("Building {} records", records);
    let batch = build_batch(records);

    let encoded = encode_value(&batch).expect("Failed to encode");
    println!("Encoded size: {} bytes\n", encoded.len());

    let eager = Decoder::new(encoded.clone());
    let lazy = eager.clone().with_options(DecodeOptions::lazy());

    let mut measurements = Vec::new();

    measurements.push(measure("encode", encoded.len(), || {
        let bytes = encode_value(&batch).expect("Failed to encode");
        assert_eq!(bytes.len(), encoded.len());
    }));

    measurements.push(measure("decode (eager)", encoded.len(), || {
        let (value, _) = eager.decode_value_at(Type::Struct, 0).expect("Failed to decode");
        assert_eq!(value.as_struct().map(Struct::len), Some(2));
    }));

    measurements.push(measure("decode (lazy scan)", encoded.len(), || {
        let (value, end) = lazy.decode_value_at(Type::Struct, 0).expect("Failed to decode");
        assert_eq!(end as usize, encoded.len());
        drop(value);
    }));

    measurements.push(measure("decode (lazy, first 10)", encoded.len(), || {
        let (value, _) = lazy.decode_value_at(Type::Struct, 0).expect("Failed to decode");
        let Some(WireValue::List(users)) = value.as_struct().and_then(|s| s.get(2)) else {
            panic!("missing users list");
        };
        // A cloned view starts over without touching the original.
        let first: Vec<WireValue> = match users {
            ValueList::Lazy(view) => view.clone().take(10).collect::<Result<_, _>>(),
            ValueList::Eager { items, .. } => Ok(items.iter().take(10).cloned().collect()),
        }
        .expect("Failed to materialize");
        assert_eq!(first.len(), records.min(10));
    }));

    measurements.push(measure("skip", encoded.len(), || {
        let end = eager.skip_at(Type::Struct, 0).expect("Failed to skip");
        assert_eq!(end as usize, encoded.len());
    }));

    // Lazy and eager decodes agree.
    let (eager_value, _) = eager.decode_value_at(Type::Struct, 0).expect("Failed to decode");
    let (lazy_value, _) = lazy.decode_value_at(Type::Struct, 0).expect("Failed to decode");
    assert_eq!(eager_value, lazy_value, "lazy and eager decodes should match");

    let list_stats = list_pool_stats();
    let map_stats = map_pool_stats();
    println!(
        "\nView pools: list created={} reused={} idle={}, map created={} reused={} idle={}",
        list_stats.created, list_stats.reused, list_stats.idle,
        map_stats.created, map_stats.reused, map_stats.idle
    );

    let report = Report {
        records,
        encoded_bytes: encoded.len(),
        iterations: ITERS,
        measurements,
        list_pool: PoolReport {
            created: list_stats.created,
            reused: list_stats.reused,
            idle: list_stats.idle,
        },
        map_pool: PoolReport {
            created: map_stats.created,
            reused: map_stats.reused,
            idle: map_stats.idle,
        },
    };

    let json = serde_json::to_string_pretty(&report).expect("Failed to serialize report");
    match report_path {
        Some(path) => {
            fs::write(&path, json).expect("Failed to write report");
            println!("Report written to {}", path);
        }
        None => println!("\n{}", json),
    }
}
