use std::sync::Arc;

use etlink_frame::{build_frame, FrameError, RecordAssembler};
use etlink_schema::{encode, ByteOrder, FieldType, FieldValue, Record, RecordSchema};

fn telemetry(order: ByteOrder) -> Arc<RecordSchema> {
    RecordSchema::builder("telemetry")
        .byte_order(order)
        .field("seq", FieldType::U16)
        .field("current", FieldType::I32)
        .field("voltage", FieldType::F32)
        .field("armed", FieldType::Bool)
        .build_shared()
        .unwrap()
}

fn sample(schema: &Arc<RecordSchema>, seq: u16) -> Record {
    Record::new(Arc::clone(schema))
        .with("seq", seq)
        .unwrap()
        .with("current", -1200i32 + i32::from(seq))
        .unwrap()
        .with("voltage", 11.5f32)
        .unwrap()
        .with("armed", seq % 2 == 0)
        .unwrap()
}

fn frame_of(record: &Record) -> Vec<u8> {
    let payload = encode(record.schema(), record).unwrap();
    build_frame(&payload).unwrap().to_vec()
}

#[test]
fn noisy_stream_in_random_chunks() {
    let schema = telemetry(ByteOrder::LittleEndian);
    let mut wire = Vec::new();
    let mut expected = Vec::new();
    for seq in 0..50u16 {
        // Noise that includes stray sync halves.
        wire.extend_from_slice(&[0x85, 0x06, 0x00][..(seq as usize % 4).min(3)]);
        let record = sample(&schema, seq);
        wire.extend_from_slice(&frame_of(&record));
        expected.push(record);
    }

    let mut asm = RecordAssembler::new(Arc::clone(&schema));
    let mut got = Vec::new();
    let mut pos = 0usize;
    let mut step = 1usize;
    while pos < wire.len() {
        let end = (pos + step).min(wire.len());
        for item in asm.feed(&wire[pos..end]) {
            got.push(item.unwrap());
        }
        pos = end;
        step = step % 17 + 3;
    }

    assert_eq!(got, expected);
    assert_eq!(asm.stats().frames, 50);
    assert_eq!(asm.stats().checksum_errors, 0);
}

#[test]
fn network_order_record_through_assembler() {
    let schema = telemetry(ByteOrder::Network);
    let record = sample(&schema, 0x0102);
    let wire = frame_of(&record);
    assert_eq!(&wire[3..5], &[0x01, 0x02]);

    let mut asm = RecordAssembler::new(schema);
    let out = asm.feed(&wire);
    let decoded = out.into_iter().next().unwrap().unwrap();
    assert_eq!(decoded.get("seq"), Some(FieldValue::U16(0x0102)));
    assert_eq!(decoded, record);
}

#[test]
fn corruption_burst_recovers_on_next_frame() {
    let schema = telemetry(ByteOrder::LittleEndian);
    let mut wire = Vec::new();
    for seq in 0..3u16 {
        let mut frame = frame_of(&sample(&schema, seq));
        let last = frame.len() - 1;
        frame[last] = frame[last].wrapping_add(1);
        wire.extend_from_slice(&frame);
    }
    let good = sample(&schema, 9);
    wire.extend_from_slice(&frame_of(&good));

    let mut asm = RecordAssembler::new(schema);
    let out = asm.feed(&wire);
    assert_eq!(out.len(), 4);
    assert!(out[..3]
        .iter()
        .all(|item| matches!(item, Err(FrameError::ChecksumMismatch { .. }))));
    assert_eq!(out[3].as_ref().unwrap(), &good);
    assert_eq!(asm.stats().checksum_errors, 3);
}
