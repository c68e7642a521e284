//! # Split / Join
//!
//! `split` cuts one serialized envelope into bounded frames; `join`
//! reconstructs it from a complete, possibly shuffled frame set.

use cv_01_numeric_codec::FieldAllowlist;
use shared_types::WalletError;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{check_joined_header, Frame, FrameGroup, WireEnvelope, FRAME_HEADER_OVERHEAD};

/// Widest JSON string escape of one character (`\u00XX`).
const MAX_ESCAPED_CHAR_WIDTH: usize = 6;

/// Split an envelope into frames whose wire text is at most
/// `max_frame_bytes`.
///
/// Chunks are measured by their escaped width inside the frame's JSON
/// `payload` string, so quotes and backslashes count twice.
///
/// # Errors
///
/// `Validation` if `max_frame_bytes` leaves no room after the frame header.
pub fn split(envelope: &WireEnvelope, max_frame_bytes: usize) -> Result<Vec<Frame>, WalletError> {
    let header = FRAME_HEADER_OVERHEAD.max(header_reserve(envelope));
    if max_frame_bytes <= header {
        return Err(WalletError::validation(format!(
            "max frame size {max_frame_bytes} does not exceed the {header}-byte header"
        )));
    }
    let capacity = max_frame_bytes - header;
    let text = envelope.to_canonical_string();

    if escaped_len(&text) <= capacity {
        debug!(tag = %envelope.type_tag, bytes = text.len(), "Envelope fits one frame");
        return Ok(vec![Frame::single(&envelope.type_tag, envelope.version, text)]);
    }

    let chunks = chunk_by_escaped_width(&text, capacity);
    let total = u32::try_from(chunks.len())
        .map_err(|_| WalletError::validation("envelope needs more than u32::MAX frames"))?;
    let data_id = Uuid::new_v4().to_string();

    info!(
        tag = %envelope.type_tag,
        bytes = text.len(),
        parts = total,
        data_id = %data_id,
        "Envelope split into frames"
    );

    Ok((1..=total)
        .zip(chunks)
        .map(|(part_index, chunk)| {
            Frame::part(
                &envelope.type_tag,
                envelope.version,
                data_id.clone(),
                part_index,
                total,
                chunk,
            )
        })
        .collect())
}

/// Wire bytes of this envelope's largest possible frame header, plus slack
/// for one character overshooting the chunk capacity.
fn header_reserve(envelope: &WireEnvelope) -> usize {
    let widest = Frame::part(
        &envelope.type_tag,
        envelope.version,
        Uuid::nil().to_string(),
        u32::MAX,
        u32::MAX,
        "",
    );
    widest.to_wire().len() + MAX_ESCAPED_CHAR_WIDTH - 1
}

/// Bytes `c` takes inside a JSON string literal.
fn escaped_width(c: char) -> usize {
    match c {
        '"' | '\\' | '\u{08}' | '\u{0c}' | '\n' | '\r' | '\t' => 2,
        c if c < '\u{20}' => MAX_ESCAPED_CHAR_WIDTH,
        c => c.len_utf8(),
    }
}

fn escaped_len(text: &str) -> usize {
    text.chars().map(escaped_width).sum()
}

/// Contiguous slices whose escaped width is at most `capacity`. A character
/// wider than `capacity` gets a slice of its own.
fn chunk_by_escaped_width(text: &str, capacity: usize) -> Vec<&str> {
    let mut chunks = Vec::with_capacity(text.len().div_ceil(capacity.max(1)));
    let mut start = 0;
    let mut width = 0;
    for (offset, c) in text.char_indices() {
        let w = escaped_width(c);
        if width + w > capacity && offset > start {
            chunks.push(&text[start..offset]);
            start = offset;
            width = 0;
        }
        width += w;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

/// Join frames using the default amount allowlist.
pub fn join(frames: &[Frame]) -> Result<WireEnvelope, WalletError> {
    join_with(frames, &FieldAllowlist::default())
}

/// Reconstruct exactly one envelope from `frames`.
///
/// # Errors
///
/// - `Validation` for malformed or mutually inconsistent frames, frames of
///   more than one envelope, or a duplicate part with different content.
/// - `IncompleteTransport` when parts are missing.
pub fn join_with(frames: &[Frame], allowlist: &FieldAllowlist) -> Result<WireEnvelope, WalletError> {
    let first = frames
        .first()
        .ok_or_else(|| WalletError::validation("no frames to join"))?;
    for frame in frames {
        frame.validate()?;
    }

    if !first.is_multi_part() {
        if frames.iter().any(|frame| frame != first) {
            return Err(WalletError::validation(
                "frames belong to more than one envelope",
            ));
        }
        let envelope = WireEnvelope::from_canonical_str(&first.payload, allowlist)?;
        check_joined_header(&envelope, &first.type_tag, first.version)?;
        return Ok(envelope);
    }

    let mut group = FrameGroup::for_frame(first);
    for frame in frames {
        if !frame.is_multi_part() || frame.data_id != first.data_id {
            return Err(WalletError::validation(
                "frames belong to more than one envelope",
            ));
        }
        group.insert(frame)?;
    }

    let envelope = group.assemble(allowlist)?;
    info!(data_id = %group.data_id(), parts = group.total(), tag = %envelope.type_tag, "Frames joined");
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_01_numeric_codec::PayloadValue;
    use proptest::prelude::*;
    use rand::seq::SliceRandom;
    use shared_types::U256;

    fn envelope_with_memo(memo: &str) -> WireEnvelope {
        WireEnvelope::new(
            "signed-transaction",
            1,
            PayloadValue::record()
                .with_field("amount", U256::from(u64::MAX) * U256::from(7u64))
                .with_field("memo", memo),
        )
    }

    #[test]
    fn test_small_envelope_is_one_frame() {
        let envelope = envelope_with_memo("short");
        let frames = split(&envelope, 1200).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].total_parts, 1);
        assert!(frames[0].data_id.is_none());
        assert_eq!(join(&frames).unwrap(), envelope);
    }

    #[test]
    fn test_large_envelope_parts_share_data_id() {
        let envelope = envelope_with_memo(&"a".repeat(3000));
        let escaped = escaped_len(&envelope.to_canonical_string());
        let capacity = 500 - FRAME_HEADER_OVERHEAD;

        let frames = split(&envelope, 500).unwrap();
        assert!(frames.len() >= escaped.div_ceil(capacity));
        assert!(frames.len() <= escaped.div_ceil(capacity - MAX_ESCAPED_CHAR_WIDTH));

        let data_id = frames[0].data_id.clone().unwrap();
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.data_id.as_deref(), Some(data_id.as_str()));
            assert_eq!(frame.part_index, i as u32 + 1);
            assert_eq!(frame.type_tag, "signed-transaction-multipart");
            assert!(escaped_len(&frame.payload) <= capacity);
            assert!(frame.to_wire().len() <= 500);
        }
    }

    #[test]
    fn test_wire_frames_fit_despite_escaping() {
        // Every character of this memo doubles or worse once escaped.
        let memo = "\"\\\n\u{01}".repeat(400);
        let envelope = envelope_with_memo(&memo);
        for max in [FRAME_HEADER_OVERHEAD + 1, FRAME_HEADER_OVERHEAD + 7, 400, 1200] {
            let frames = split(&envelope, max).unwrap();
            assert!(frames.len() > 1);
            for frame in &frames {
                assert!(frame.to_wire().len() <= max, "{} > {max}", frame.to_wire().len());
            }
            assert_eq!(join(&frames).unwrap(), envelope);
        }
    }

    #[test]
    fn test_header_reserve_covers_widest_builtin_tag() {
        let envelope = WireEnvelope::new("submitted-transaction", u32::MAX, PayloadValue::record());
        assert!(header_reserve(&envelope) <= FRAME_HEADER_OVERHEAD);
    }

    #[test]
    fn test_long_custom_tag_raises_header_reserve() {
        let envelope = WireEnvelope::new("x".repeat(300), 1, PayloadValue::record());
        assert!(matches!(split(&envelope, 400), Err(WalletError::Validation(_))));
        let frames = split(&envelope, 600).unwrap();
        assert!(frames.iter().all(|f| f.to_wire().len() <= 600));
    }

    #[test]
    fn test_split_rejects_frames_smaller_than_header() {
        let envelope = envelope_with_memo("x");
        assert!(matches!(
            split(&envelope, FRAME_HEADER_OVERHEAD),
            Err(WalletError::Validation(_))
        ));
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let envelope = envelope_with_memo(&"€ü漢🙂".repeat(40));
        let frames = split(&envelope, FRAME_HEADER_OVERHEAD + 7).unwrap();
        assert!(frames.len() > 1);
        assert_eq!(join(&frames).unwrap(), envelope);
    }

    #[test]
    fn test_wide_char_beyond_capacity_gets_own_chunk() {
        let chunks = chunk_by_escaped_width("a🙂b", 2);
        assert_eq!(chunks, vec!["a", "🙂", "b"]);
    }

    #[test]
    fn test_escapes_count_toward_chunk_width() {
        assert_eq!(chunk_by_escaped_width(r#"ab"c"#, 3), vec!["ab", "\"c"]);
        assert_eq!(escaped_len("a\tb\u{02}"), 1 + 2 + 1 + 6);
    }

    #[test]
    fn test_shuffled_join() {
        let envelope = envelope_with_memo(&"z".repeat(2000));
        let mut frames = split(&envelope, 400).unwrap();
        frames.shuffle(&mut rand::thread_rng());
        assert_eq!(join(&frames).unwrap(), envelope);
    }

    #[test]
    fn test_missing_parts_reported() {
        let envelope = envelope_with_memo(&"m".repeat(2000));
        let mut frames = split(&envelope, 400).unwrap();
        let total = frames.len() as u32;
        frames.remove(2);
        frames.remove(0);

        match join(&frames) {
            Err(WalletError::IncompleteTransport { data_id, missing, total: t }) => {
                assert_eq!(Some(data_id), frames[0].data_id.clone());
                assert_eq!(missing, vec![1, 3]);
                assert_eq!(t, total);
            }
            other => panic!("expected incomplete transport, got {other:?}"),
        }
    }

    #[test]
    fn test_identical_duplicate_ignored() {
        let envelope = envelope_with_memo(&"d".repeat(1500));
        let mut frames = split(&envelope, 400).unwrap();
        frames.push(frames[1].clone());
        assert_eq!(join(&frames).unwrap(), envelope);
    }

    #[test]
    fn test_corrupted_duplicate_fails_closed() {
        let envelope = envelope_with_memo(&"c".repeat(1500));
        let mut frames = split(&envelope, 400).unwrap();
        let mut corrupted = frames[1].clone();
        corrupted.payload = corrupted.payload.replace('c', "k");
        frames.push(corrupted);
        assert!(matches!(join(&frames), Err(WalletError::Validation(_))));
    }

    #[test]
    fn test_frames_of_two_envelopes_rejected() {
        let a = split(&envelope_with_memo(&"a".repeat(1500)), 400).unwrap();
        let b = split(&envelope_with_memo(&"b".repeat(1500)), 400).unwrap();
        let mixed: Vec<Frame> = a.iter().chain(b.iter()).cloned().collect();
        assert!(matches!(join(&mixed), Err(WalletError::Validation(_))));

        let singles = vec![
            split(&envelope_with_memo("one"), 1200).unwrap().remove(0),
            split(&envelope_with_memo("two"), 1200).unwrap().remove(0),
        ];
        assert!(matches!(join(&singles), Err(WalletError::Validation(_))));
    }

    #[test]
    fn test_disagreeing_total_parts_rejected() {
        let mut frames = split(&envelope_with_memo(&"t".repeat(1500)), 400).unwrap();
        let last = frames.len() - 1;
        frames[last].total_parts += 1;
        assert!(matches!(join(&frames), Err(WalletError::Validation(_))));
    }

    #[test]
    fn test_joined_tag_must_match_frame_tag() {
        let text = envelope_with_memo("x").to_canonical_string();
        let frame = Frame::single("unsigned-transaction", 1, text);
        assert!(matches!(join(&[frame]), Err(WalletError::Validation(_))));
    }

    #[test]
    fn test_empty_frame_set_rejected() {
        assert!(matches!(join(&[]), Err(WalletError::Validation(_))));
    }

    proptest! {
        #[test]
        fn prop_join_split_round_trip(
            memo in "[ -~]{0,600}",
            amount in any::<u128>(),
            extra in 1usize..400,
        ) {
            let envelope = WireEnvelope::new(
                "unsigned-transaction",
                1,
                PayloadValue::record()
                    .with_field("amount", U256::from(amount))
                    .with_field("memo", memo),
            );
            let max = FRAME_HEADER_OVERHEAD + extra;
            let frames = split(&envelope, max).unwrap();
            prop_assert!(frames.iter().all(|f| f.to_wire().len() <= max));
            prop_assert_eq!(join(&frames).unwrap(), envelope);
        }
    }
}
