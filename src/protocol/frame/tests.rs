//! Codec tests: layout, round trips, sentinel and checksum rejection.
use super::*;
use crate::core::{HEADER_ACK, HEADER_DATA, HEADER_START};

fn codec() -> FrameCodec {
    FrameCodec::new(Endianness::Little, Crc32)
}

//==================================================================================LAYOUT
#[test]
/// A Start frame is 16 bytes laid out header, version, id, addr, len, crc, tail.
fn test_start_layout() {
    let frame = StartFrame::new(0x0403_0201, Address(0x0005), 10);
    let mut out = [0u8; 32];
    let len = codec().encode_start(&frame, &mut out).unwrap();

    assert_eq!(len, START_FRAME_LEN);
    assert_eq!(
        &out[..11],
        &[HEADER_START, 0x00, 0x01, 0x01, 0x02, 0x03, 0x04, 0x05, 0x00, 0x0A, 0x00]
    );
    let crc = Crc32.checksum(&out[..11], 0);
    assert_eq!(&out[11..15], &crc.to_le_bytes());
    assert_eq!(out[15], TAIL);
}

#[test]
/// Ack frames have no id: header, version, addr, code, crc, tail.
fn test_ack_layout_big_endian() {
    let frame = AckFrame::new(Address::CONTROLLER, AckCode::NACK);
    let mut out = [0u8; ACK_FRAME_LEN];
    let codec = FrameCodec::new(Endianness::Big, Crc32);
    let len = codec.encode_ack(&frame, &mut out).unwrap();

    assert_eq!(len, ACK_FRAME_LEN);
    assert_eq!(&out[..7], &[HEADER_ACK, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01]);
    let crc = Crc32.checksum(&out[..7], 0);
    assert_eq!(&out[7..11], &crc.to_be_bytes());
    assert_eq!(out[11], TAIL);
}

#[test]
/// The Data checksum covers the payload too.
fn test_data_layout() {
    let payload = [0xAA, 0xBB, 0xCC];
    let frame = DataFrame::new(7, Address(0x0010), &payload);
    let mut out = [0u8; 64];
    let len = codec().encode_data(&frame, &mut out).unwrap();

    assert_eq!(len, DATA_FRAME_OVERHEAD + 3);
    assert_eq!(out[0], HEADER_DATA);
    assert_eq!(&out[9..11], &[3, 0]);
    assert_eq!(&out[11..14], &payload);
    let crc = Crc32.checksum(&out[..14], 0);
    assert_eq!(&out[14..18], &crc.to_le_bytes());
    assert_eq!(out[18], TAIL);
}

#[test]
/// Encoding into a short buffer reports the needed size.
fn test_encode_buffer_too_small() {
    let frame = StartFrame::new(1, Address(2), 3);
    let mut out = [0u8; 10];
    assert_eq!(
        codec().encode_start(&frame, &mut out),
        Err(FrameError::BufferTooSmall {
            needed: START_FRAME_LEN,
            available: 10
        })
    );
}

//==================================================================================ROUND_TRIP
#[test]
/// Each variant decodes back to itself, for both byte orders.
fn test_round_trip_each_variant() {
    let payload: [u8; 5] = [1, 2, 3, 4, 5];
    let frames = [
        Frame::Start(StartFrame::new(42, Address(0x0005), 10)),
        Frame::Ack(AckFrame::new(Address::CONTROLLER, AckCode::ACK)),
        Frame::Data(DataFrame::new(42, Address::BROADCAST, &payload)),
        Frame::Data(DataFrame::new(u32::MAX, Address(0x1234), &[])),
    ];

    for endianness in [Endianness::Little, Endianness::Big] {
        let codec = FrameCodec::new(endianness, Crc32);
        for frame in frames.iter() {
            let mut out = [0u8; 64];
            let len = codec.encode(frame, &mut out).unwrap();
            let decoded = codec.decode(&out[..len]).unwrap();
            assert_eq!(&decoded, frame);
            assert_eq!(decoded.kind(), frame.kind());
        }
    }
}

#[test]
/// Typed decoders refuse the other frame kinds.
fn test_typed_decoder_rejects_other_kind() {
    let mut out = [0u8; 32];
    let len = codec()
        .encode_ack(&AckFrame::new(Address(1), AckCode::ACK), &mut out)
        .unwrap();

    assert_eq!(
        codec().decode_start(&out[..len]),
        Err(FrameError::Malformed)
    );
    assert!(codec().decode_ack(&out[..len]).is_ok());
}

//==================================================================================REJECTION
#[test]
/// Wrong header fails closed before anything else is read.
fn test_bad_header_is_malformed() {
    let mut out = [0u8; 32];
    let len = codec()
        .encode_start(&StartFrame::new(1, Address(5), 10), &mut out)
        .unwrap();
    out[0] = 0x55;
    assert_eq!(codec().decode(&out[..len]), Err(FrameError::Malformed));
}

#[test]
/// Wrong tail is malformed, not an integrity failure.
fn test_bad_tail_is_malformed() {
    let payload = [9u8; 4];
    let mut out = [0u8; 32];
    let len = codec()
        .encode_data(&DataFrame::new(1, Address(5), &payload), &mut out)
        .unwrap();
    out[len - 1] = 0x00;
    assert_eq!(codec().decode_data(&out[..len]), Err(FrameError::Malformed));
}

#[test]
/// Any single-bit flip in version, id, address or payload is caught by the checksum.
fn test_single_bit_corruption_detected() {
    let payload = [0x00, 0xFF, 0x5A, 0xA5, 0x10, 0x01, 0x80, 0x7F];
    let mut clean = [0u8; 64];
    let len = codec()
        .encode_data(&DataFrame::new(0xCAFE, Address(0x0042), &payload), &mut clean)
        .unwrap();

    // Version, id and address span bytes 1..9; the payload starts at 11.
    // The length field is covered by the framing test below.
    let protected = (1..9).chain(11..11 + payload.len());
    for byte in protected {
        for bit in 0..8 {
            let mut corrupted = clean;
            corrupted[byte] ^= 1 << bit;
            let result = codec().decode_data(&corrupted[..len]);
            assert!(
                matches!(result, Err(FrameError::Integrity { .. })),
                "flip at byte {byte} bit {bit} gave {result:?}"
            );
        }
    }
}

#[test]
/// Flips in the header, length or tail never decode: the frame is rejected
/// before the checksum is even compared.
fn test_single_bit_corruption_of_framing_fields() {
    let payload = [0x00, 0xFF, 0x5A, 0xA5, 0x10, 0x01, 0x80, 0x7F];
    let mut clean = [0u8; 64];
    let len = codec()
        .encode_data(&DataFrame::new(0xCAFE, Address(0x0042), &payload), &mut clean)
        .unwrap();

    // A corrupted length shifts where the checksum and tail are read from.
    let framing = [0, 9, 10, len - 1];
    for byte in framing {
        for bit in 0..8 {
            let mut corrupted = clean;
            corrupted[byte] ^= 1 << bit;
            let result = codec().decode_data(&corrupted[..len]);
            assert!(
                matches!(
                    result,
                    Err(FrameError::Malformed | FrameError::Truncated { .. })
                ),
                "flip at byte {byte} bit {bit} gave {result:?}"
            );
        }
    }
}

#[test]
/// Flipping a checksum bit is reported with both values.
fn test_checksum_field_corruption() {
    let mut out = [0u8; 32];
    let len = codec()
        .encode_start(&StartFrame::new(3, Address(5), 1), &mut out)
        .unwrap();
    let genuine = u32::from_le_bytes([out[11], out[12], out[13], out[14]]);
    out[12] ^= 0x01;

    match codec().decode_start(&out[..len]) {
        Err(FrameError::Integrity { expected, computed }) => {
            assert_eq!(computed, genuine);
            assert_ne!(expected, genuine);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
/// A frame cut short is truncated; an empty buffer too.
fn test_truncated_frame() {
    let payload = [1u8; 20];
    let mut out = [0u8; 64];
    let len = codec()
        .encode_data(&DataFrame::new(1, Address(5), &payload), &mut out)
        .unwrap();

    assert!(matches!(
        codec().decode(&out[..len - 3]),
        Err(FrameError::Truncated { .. })
    ));
    assert!(matches!(
        codec().decode(&[]),
        Err(FrameError::Truncated { .. })
    ));
}

#[test]
/// A frame from another major version is refused even with a valid checksum.
fn test_unsupported_major_version() {
    let mut frame = StartFrame::new(1, Address(5), 1);
    frame.version = 0x0200;
    let mut out = [0u8; 32];
    let len = codec().encode_start(&frame, &mut out).unwrap();
    assert_eq!(
        codec().decode(&out[..len]),
        Err(FrameError::UnsupportedVersion { version: 0x0200 })
    );

    // Minor bumps stay compatible.
    frame.version = 0x0107;
    let len = codec().encode_start(&frame, &mut out).unwrap();
    assert_eq!(codec().decode_start(&out[..len]), Ok(frame));
}

#[test]
/// A custom checksum strategy is used on both sides.
fn test_custom_checksum_strategy() {
    let xor = |bytes: &[u8], seed: u32| bytes.iter().fold(seed, |acc, b| acc ^ *b as u32);
    let xor_codec = FrameCodec::new(Endianness::Little, xor);
    let mut out = [0u8; 32];
    let len = xor_codec
        .encode_ack(&AckFrame::new(Address(9), AckCode::ACK), &mut out)
        .unwrap();
    assert_eq!(
        xor_codec.decode_ack(&out[..len]),
        Ok(AckFrame::new(Address(9), AckCode::ACK))
    );
    // The default codec disagrees with that checksum.
    assert!(matches!(
        codec().decode_ack(&out[..len]),
        Err(FrameError::Integrity { .. })
    ));
}
