//! File-based air-gap transfer.
//!
//! Each frame is written as one file holding its wire text, the same string a
//! barcode would carry. Joining reads the files back in any order.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cv_01_numeric_codec::FieldAllowlist;
use cv_02_frame_transport::{Frame, TransportConfig};
use cv_03_envelope_lifecycle::{Envelope, ImportProgress, ImportSession};
use tracing::info;

/// Summary of a classified envelope, one `key: value` per line.
pub fn describe(envelope: &Envelope) -> String {
    let mut lines = vec![
        format!("kind: {}", envelope.kind()),
        format!("version: {}", envelope.version()),
        format!("classified-by: {:?}", envelope.classification().rule()),
    ];
    if let Ok(snapshot) = envelope.to_utxo_snapshot() {
        lines.push(format!("utxos: {}", snapshot.count()));
        lines.push(format!("total-value: {}", snapshot.total_value()));
        lines.push(format!("network: {}", snapshot.network()));
    }
    lines.join("\n")
}

/// Classify the envelope in `input` and write its frames into `out_dir`.
///
/// Returns the written paths in part order.
pub fn split_file(input: &Path, out_dir: &Path, max_frame_bytes: usize) -> Result<Vec<PathBuf>> {
    TransportConfig {
        max_frame_bytes,
        ..Default::default()
    }
    .validate()?;

    let text = fs::read_to_string(input)
        .with_context(|| format!("reading envelope from {}", input.display()))?;
    let envelope = Envelope::import(&text, &FieldAllowlist::default())
        .with_context(|| format!("classifying {}", input.display()))?;
    let frames = envelope.to_frames(max_frame_bytes)?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let mut written = Vec::with_capacity(frames.len());
    for frame in &frames {
        let path = out_dir.join(format!(
            "{}-{:03}-of-{:03}.frame",
            envelope.type_tag(),
            frame.part_index,
            frame.total_parts
        ));
        fs::write(&path, frame.to_wire())
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    info!(
        kind = %envelope.kind(),
        frames = written.len(),
        out_dir = %out_dir.display(),
        "Envelope split"
    );
    Ok(written)
}

/// Reassemble frame files into one envelope.
///
/// Fails listing the missing part indices if the set is incomplete.
pub fn join_files(paths: &[PathBuf]) -> Result<Envelope> {
    if paths.is_empty() {
        bail!("no frame files given");
    }
    let mut session = ImportSession::new();
    let mut last_pending = None;
    for path in paths {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading frame {}", path.display()))?;
        match session
            .import_frame_text(text.trim())
            .with_context(|| format!("importing frame {}", path.display()))?
        {
            ImportProgress::Imported(envelope) => return Ok(envelope),
            ImportProgress::Pending(pending) => last_pending = Some(pending),
            ImportProgress::Duplicate => {}
        }
    }
    match last_pending {
        Some(pending) => bail!(
            "transport {} incomplete: have {}/{} parts, missing {:?}",
            pending.data_id,
            pending.received,
            pending.total,
            pending.missing
        ),
        None => bail!("frames did not produce an envelope"),
    }
}

/// Describe a file holding either an envelope or a single frame.
pub fn inspect_file(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let text = text.trim();

    if let Ok(frame) = Frame::from_wire(text) {
        if frame.is_multi_part() {
            return Ok(format!(
                "frame: {} part {}/{} of {}",
                frame.envelope_tag(),
                frame.part_index,
                frame.total_parts,
                frame.data_id.as_deref().unwrap_or("-")
            ));
        }
        let envelope = join_files(&[path.to_path_buf()])?;
        return Ok(describe(&envelope));
    }

    let envelope = Envelope::import(text, &FieldAllowlist::default())
        .with_context(|| format!("classifying {}", path.display()))?;
    Ok(describe(&envelope))
}
