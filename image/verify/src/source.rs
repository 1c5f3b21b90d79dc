/*++

Licensed under the Apache-2.0 license.

File Name:

   source.rs

Abstract:

    Byte-range access to boot storage and the image loader.

--*/

use crate::parser::{cross_check_layout, read_header, validate_header};
use boot0_error::{BootError, BootResult};
use boot0_image_types::{LayoutCarrier, IMAGE_DESCRIPTOR_BYTE_SIZE};

/// Storage holding candidate images.
pub trait ImageSource {
    /// Number of readable bytes.
    fn len(&self) -> u32;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` from `offset`. Reads past the end fail.
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> BootResult<()>;
}

/// Image source backed by memory.
#[derive(Debug, Copy, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl ImageSource for SliceSource<'_> {
    fn len(&self) -> u32 {
        u32::try_from(self.data.len()).unwrap_or(u32::MAX)
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> BootResult<()> {
        let start = offset as usize;
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.data.get(start..end))
            .ok_or(BootError::FORMAT_ERR_IMAGE_SOURCE_READ)?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

/// Read the image at `carrier.base` into `buf`.
///
/// The declared length is taken from the header and checked against the
/// carrier before the remainder of the image is read.
///
/// # Returns
///
/// * `&[u8]` - The loaded image, exactly the declared length
pub fn load_image<'b, S: ImageSource + ?Sized>(
    source: &mut S,
    carrier: &LayoutCarrier,
    buf: &'b mut [u8],
) -> BootResult<&'b [u8]> {
    let head = buf
        .get_mut(..IMAGE_DESCRIPTOR_BYTE_SIZE)
        .ok_or(BootError::FORMAT_ERR_IMAGE_BUFFER_TOO_SMALL)?;
    source.read(carrier.base, head)?;

    let header = read_header(head)?;
    validate_header(header)?;
    let total = header.total_len();
    cross_check_layout(total, carrier)?;

    let image = buf
        .get_mut(..total as usize)
        .ok_or(BootError::FORMAT_ERR_IMAGE_BUFFER_TOO_SMALL)?;
    let rest_offset = carrier
        .base
        .checked_add(IMAGE_DESCRIPTOR_BYTE_SIZE as u32)
        .ok_or(BootError::FORMAT_ERR_LAYOUT_CARRIER_OVERFLOW)?;
    source.read(rest_offset, &mut image[IMAGE_DESCRIPTOR_BYTE_SIZE..])?;

    log::debug!("loaded 0x{:x} bytes from 0x{:x}", total, carrier.base);
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boot0_image_gen::{ImageGenerator, ImageGeneratorConfig, StaticSigner};

    fn image() -> Vec<u8> {
        ImageGenerator::new(StaticSigner::default())
            .generate(&ImageGeneratorConfig::with_payload(vec![7; 0x30]))
            .unwrap()
            .bytes
    }

    #[test]
    fn test_slice_source_bounds() {
        let data = [1u8, 2, 3, 4];
        let mut source = SliceSource::new(&data);
        let mut buf = [0u8; 2];
        source.read(2, &mut buf).unwrap();
        assert_eq!(buf, [3, 4]);
        assert_eq!(
            source.read(3, &mut buf),
            Err(BootError::FORMAT_ERR_IMAGE_SOURCE_READ)
        );
        assert_eq!(
            source.read(u32::MAX, &mut buf),
            Err(BootError::FORMAT_ERR_IMAGE_SOURCE_READ)
        );
    }

    #[test]
    fn test_load_at_offset() {
        let image = image();
        let mut storage = vec![0xffu8; 0x200];
        storage.extend_from_slice(&image);
        storage.extend_from_slice(&[0xff; 0x40]);

        let carrier = LayoutCarrier {
            base: 0x200,
            loaded_len: image.len() as u32,
            limit: storage.len() as u32,
        };
        let mut buf = vec![0u8; 0x4000];
        let loaded = load_image(&mut SliceSource::new(&storage), &carrier, &mut buf).unwrap();
        assert_eq!(loaded, &image[..]);
    }

    #[test]
    fn test_load_buffer_too_small() {
        let image = image();
        let mut buf = vec![0u8; image.len() - 1];
        assert_eq!(
            load_image(
                &mut SliceSource::new(&image),
                &LayoutCarrier::default(),
                &mut buf
            ),
            Err(BootError::FORMAT_ERR_IMAGE_BUFFER_TOO_SMALL)
        );

        let mut buf = [0u8; 0x10];
        assert_eq!(
            load_image(
                &mut SliceSource::new(&image),
                &LayoutCarrier::default(),
                &mut buf
            ),
            Err(BootError::FORMAT_ERR_IMAGE_BUFFER_TOO_SMALL)
        );
    }

    #[test]
    fn test_load_exceeds_carrier() {
        let image = image();
        let carrier = LayoutCarrier::exact(image.len() as u32 - 4);
        let mut buf = vec![0u8; 0x4000];
        assert_eq!(
            load_image(&mut SliceSource::new(&image), &carrier, &mut buf),
            Err(BootError::FORMAT_ERR_LAYOUT_CARRIER_OVERFLOW)
        );
    }

    #[test]
    fn test_load_bad_header() {
        let mut image = image();
        image[0x30] = 0;
        let mut buf = vec![0u8; 0x4000];
        assert_eq!(
            load_image(
                &mut SliceSource::new(&image),
                &LayoutCarrier::default(),
                &mut buf
            ),
            Err(BootError::FORMAT_ERR_HEADER_TAG_BLOCK_MISMATCH)
        );
    }
}
