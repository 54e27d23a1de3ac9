//! Simple decoder to inspect Thrift binary messages.
//!
//! Usage: `dump_message <file> [--lazy] [--framed]`

use std::fs;

use thrift_wire::codec::FieldHeader;
use thrift_wire::{DecodeOptions, Decoder, EnvelopeKind, Type, WireValue};

const ALL_KINDS: &[EnvelopeKind] = &[
    EnvelopeKind::Unary,
    EnvelopeKind::Reply,
    EnvelopeKind::Exception,
    EnvelopeKind::Oneway,
];

fn summarize(v: &WireValue) -> String {
    match v {
        WireValue::Binary(b) => match std::str::from_utf8(b) {
            Ok(s) => {
                let preview: String = s.chars().take(80).collect();
                if s.len() > 80 {
                    format!("\"{}...\"", preview)
                } else {
                    format!("\"{}\"", preview)
                }
            }
            Err(_) => format!("BYTES[{}]", b.len()),
        },
        WireValue::Struct(s) => format!("struct ({} fields)", s.len()),
        WireValue::List(l) => format!("list<{}> ({} items)", l.value_type(), l.len()),
        WireValue::Set(l) => format!("set<{}> ({} items)", l.value_type(), l.len()),
        WireValue::Map(m) => format!("map<{}, {}> ({} entries)", m.key_type(), m.value_type(), m.len()),
        other => other.to_string(),
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "message.bin".to_string());
    let flags: Vec<String> = args.collect();
    let lazy = flags.iter().any(|f| f == "--lazy");
    let framed = flags.iter().any(|f| f == "--framed");

    println!("Reading: {}", path);

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let options = if lazy { DecodeOptions::lazy() } else { DecodeOptions::new() };
    let decoder = Decoder::new(data).with_options(options);
    let start = if framed { 4 } else { 0 };

    let (header, body_offset, _) = decoder
        .read_request_at(ALL_KINDS, start)
        .expect("Failed to read envelope");

    println!("\n=== Envelope ===");
    if header.is_none() {
        println!("(bare message)");
    } else {
        println!("Name: {}", header.name);
        println!("Kind: {:?}", header.kind);
        println!("Seq ID: {}", header.seq_id);
    }
    println!("Body offset: {}", body_offset);

    // Walk top-level fields without decoding them to show the layout.
    println!("\n=== Fields ===");
    let mut cursor = decoder.cursor(body_offset);
    loop {
        let field_offset = cursor.position();
        let Some(FieldHeader { id, ttype }) = cursor.read_field_begin().expect("Failed to read field") else {
            break;
        };
        let value_offset = cursor.position();
        cursor.skip(ttype).expect("Failed to skip field");
        println!(
            "  field {:>5} {:<8} @ {:>6} ({} bytes)",
            id,
            ttype.to_string(),
            field_offset,
            cursor.position() - value_offset
        );
    }

    let (body, end) = decoder
        .decode_value_at(Type::Struct, body_offset)
        .expect("Failed to decode");

    println!("\n=== Values ===");
    if let WireValue::Struct(s) = &body {
        for field in s.fields.iter().take(20) {
            println!("  {} = {}", field.id, summarize(&field.value));
        }
        if s.len() > 20 {
            println!("  ... and {} more fields", s.len() - 20);
        }
    }

    println!("\n=== Full Value ===");
    println!("{}", body);
    println!("\nDecoded {} bytes", end - body_offset);
}
