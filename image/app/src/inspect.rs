/*++

Licensed under the Apache-2.0 license.

File Name:

   inspect.rs

Abstract:

    File contains implementation of the boot0 image inspection command.

--*/

use anyhow::Context;
use boot0_image_types::{LayoutCarrier, RegionMode};
use boot0_image_verify::{build_sig_index, ImageLayout, Tag};
use clap::ArgMatches;
use std::path::PathBuf;

/// Run the command
pub(crate) fn run_cmd(args: &ArgMatches) -> anyhow::Result<()> {
    let image_path: &PathBuf = args
        .get_one::<PathBuf>("image")
        .with_context(|| "image arg not specified")?;

    let bytes = std::fs::read(image_path)
        .with_context(|| format!("Failed to read image {}", image_path.display()))?;
    let len = u32::try_from(bytes.len()).context("Image too large")?;

    let layout = ImageLayout::parse(&bytes, &LayoutCarrier::exact(len))
        .with_context(|| format!("Invalid boot0 image {}", image_path.display()))?;

    let header = layout.header();
    println!("Header");
    println!("  type:            0x{:08x}", header.type_word());
    println!("  magic:           0x{:08x} 0x{:08x}", header.magic_a(), header.magic_b());
    println!("  total length:    0x{:x}", header.total_len());
    println!("  descriptor len:  0x{:x}", header.descriptor_len());

    let descriptor = layout.descriptor();
    println!("Descriptor");
    println!("  version:         {}", descriptor.version());
    println!("  trailer offset:  0x{:x}", descriptor.trailer_offset());
    for (i, entry) in descriptor.entries().iter().enumerate() {
        println!("  load entry {i}:    0x{:x} + 0x{:x}", entry.offset(), entry.size());
    }

    println!("Tags");
    for tag in layout.tags() {
        let tag = tag?;
        print!("  0x{:06x} {:?} (0x{:x} bytes)", tag.offset, tag.kind(), tag.size());
        match tag.tag {
            Tag::Layout(layout_tag) => {
                let mode = RegionMode::from_u16(layout_tag.region.mode());
                println!(" regions {:?} x {}", mode, layout_tag.region.count());
            }
            Tag::Key(key) => println!(" rsa-{} e={}", key.key_bits(), key.exponent()),
            Tag::Signature(sig) => println!(" sig_len={}", sig.sig_len()),
        }
    }

    match build_sig_index(&layout) {
        Ok(index) => {
            println!("Signed regions");
            for entry in index.entries() {
                println!(
                    "  tag {} at 0x{:x} (0x{:x} bytes)",
                    entry.tag_id, entry.offset, entry.size
                );
            }
        }
        Err(err) => log::warn!("signed region index unavailable: {err}"),
    }

    Ok(())
}
