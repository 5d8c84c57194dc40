//! Operator-facing report lines.
//!
//! Pure formatting over the data the collector and stores expose; every
//! function writes to a `dyn Write` so the CLI can target stdout and tests a
//! `Vec<u8>`.
//!
//! ```text
//! gc    → "3 resource(s) total, 1 resource(s) removed."
//! prune → "5 record(s) purged."
//! tags  → "Tag \"Nature\" deleted."
//! list  → "<id>\t<label> (800x600) [2 variant(s)]" ... "# 3 assets (4 variants) Total size in MB: ..."
//! ```

use std::io::{self, Write};

use crate::gc::SweepReport;
use crate::model::ImageRecord;
use crate::tx::Removal;

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// Summary line of a reachability sweep.
pub fn write_gc_summary(writer: &mut dyn Write, report: &SweepReport) -> io::Result<()> {
    writeln!(
        writer,
        "{} resource(s) total, {} resource(s) removed.",
        report.total_before, report.removed
    )
}

/// Summary line of an unconditional prune.
pub fn write_prune_summary(writer: &mut dyn Write, report: &SweepReport) -> io::Result<()> {
    writeln!(writer, "{} record(s) purged.", report.removed)
}

/// One line per selected record, for auditing before or after deletion.
///
/// Records the store refused to delete are listed separately with the reason.
pub fn write_candidates(writer: &mut dyn Write, report: &SweepReport) -> io::Result<()> {
    let verb = if report.dry_run { "would remove" } else { "removed" };
    for candidate in &report.candidates {
        let refused = report
            .failed
            .iter()
            .any(|f| matches!(&f.removal, Removal::Image(id) if *id == candidate.identifier));
        if refused {
            continue;
        }
        writeln!(
            writer,
            "{verb} {}\t{} ({:.0} kb)",
            candidate.identifier,
            candidate.label,
            candidate.byte_size as f64 / KB
        )?;
    }
    for failure in &report.failed {
        writeln!(writer, "not removed {}: {}", failure.removal, failure.reason)?;
    }
    Ok(())
}

/// Line printed for every deleted tag.
pub fn write_tag_deleted(writer: &mut dyn Write, label: &str) -> io::Result<()> {
    writeln!(writer, "Tag \"{label}\" deleted.")
}

/// Details of one image and its variants.
pub fn write_image_details(writer: &mut dyn Write, image: &ImageRecord) -> io::Result<()> {
    writeln!(writer, "Filename: {}", image.resource.filename)?;
    writeln!(writer, "Filesize (original): {:.1} kb", image.resource.kilobytes())?;
    writeln!(writer, "Image size: {}x{}", image.width, image.height)?;
    writeln!(writer)?;
    writeln!(writer, "Image Variants: ({})", image.variants.len())?;
    for variant in &image.variants {
        writeln!(
            writer,
            "{} ({}x{}, aspect ratio {:.2}) {:.0} kb",
            variant.identifier,
            variant.width,
            variant.height,
            variant.aspect_ratio(),
            variant.resource.kilobytes()
        )?;
    }
    Ok(())
}

/// Running totals for a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingTotals {
    pub assets: u64,
    pub variants: u64,
    pub original_bytes: u64,
    pub variant_bytes: u64,
}

impl ListingTotals {
    pub fn add(&mut self, image: &ImageRecord) {
        self.assets += 1;
        self.variants += image.variants.len() as u64;
        self.original_bytes += image.resource.byte_size;
        self.variant_bytes += image.variants_byte_size();
    }

    pub fn total_bytes(&self) -> u64 {
        self.original_bytes + self.variant_bytes
    }
}

/// One listing line.
pub fn write_listing_line(writer: &mut dyn Write, image: &ImageRecord) -> io::Result<()> {
    writeln!(
        writer,
        "{}\t{} ({}x{}) [{} variant(s)]",
        image.identifier,
        image.label,
        image.width,
        image.height,
        image.variants.len()
    )
}

/// Trailing summary of a listing.
pub fn write_listing_summary(writer: &mut dyn Write, totals: &ListingTotals) -> io::Result<()> {
    writeln!(
        writer,
        "# {} assets ({} variants) Total size in MB: {:.1} (Original Images: {:.1}, Variants: {:.1})",
        totals.assets,
        totals.variants,
        totals.total_bytes() as f64 / MB,
        totals.original_bytes as f64 / MB,
        totals.variant_bytes as f64 / MB
    )
}
