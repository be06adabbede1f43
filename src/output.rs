use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::protocol::Sample;

pub fn write_samples(writer: &mut dyn Write, samples: &[Sample]) -> std::io::Result<()> {
    for sample in samples {
        writer.write_all(sample.to_line().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Write all samples to `path`, replacing any previous contents.
pub fn write_to_path(path: &Path, samples: &[Sample]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_samples(&mut writer, samples)?;
    // BufWriter swallows errors on drop, hence the explicit flush.
    writer.flush()?;
    log::info!("wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}
