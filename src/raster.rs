use std::borrow::Cow;

use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::{Error, Result};

/// row-major 8-bit raster with 1 (grey), 3 (RGB) or 4 (RGBA) interleaved channels.
/// renders are always RGB; references may arrive as grey or RGB.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(Error::InvalidConfig(format!(
                "rasters carry 1, 3 or 4 channels, got {channels}"
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(Error::InvalidConfig(format!(
                "raster buffer holds {} bytes, {width}x{height}x{channels} needs {expected}",
                data.len()
            )));
        }
        Ok(Self { width, height, channels, data })
    }

    /// raster with every pixel set to `value`, one channel per byte (at most 4).
    /// an empty `value` gives a zeroed grey raster.
    pub fn filled(width: u32, height: u32, value: &[u8]) -> Self {
        let value = if value.is_empty() { &[0u8][..] } else { value };
        let channels = value.len().min(4) as u8;
        let mut data = Vec::with_capacity(width as usize * height as usize * channels as usize);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&value[..channels as usize]);
        }
        Self { width, height, channels, data }
    }

    /// decode any image into an RGB raster (alpha is dropped)
    pub fn from_image(img: &DynamicImage) -> Self {
        profiling::scope!("Raster::from_image");
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self { width, height, channels: 3, data: rgb.into_raw() }
    }

    pub fn to_image(&self) -> DynamicImage {
        match self.channels {
            1 => GrayImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageLuma8)
                .unwrap_or_else(|| DynamicImage::new_luma8(self.width, self.height)),
            _ => {
                let rgb = self.to_rgb();
                RgbImage::from_raw(self.width, self.height, rgb.data.clone())
                    .map(DynamicImage::ImageRgb8)
                    .unwrap_or_else(|| DynamicImage::new_rgb8(self.width, self.height))
            }
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels as usize;
        let idx = (y as usize * self.width as usize + x as usize) * c;
        &self.data[idx..idx + c]
    }

    /// RGB value of a pixel; grey pixels are replicated across channels
    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let px = self.pixel(x, y);
        if self.channels == 1 {
            [px[0], px[0], px[0]]
        } else {
            [px[0], px[1], px[2]]
        }
    }

    pub fn to_rgb(&self) -> Cow<'_, Raster> {
        match self.channels {
            3 => Cow::Borrowed(self),
            1 => Cow::Owned(Raster {
                width: self.width,
                height: self.height,
                channels: 3,
                data: self.data.iter().flat_map(|&v| [v, v, v]).collect(),
            }),
            _ => Cow::Owned(Raster {
                width: self.width,
                height: self.height,
                channels: 3,
                data: self
                    .data
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect(),
            }),
        }
    }

    /// channel mean per pixel, rounded
    pub fn to_gray(&self) -> Cow<'_, Raster> {
        if self.channels == 1 {
            return Cow::Borrowed(self);
        }
        let take = self.channels.min(3) as usize;
        let data = self
            .data
            .chunks_exact(self.channels as usize)
            .map(|px| {
                let sum: u32 = px[..take].iter().map(|&v| v as u32).sum();
                ((sum as f32 / take as f32).round()) as u8
            })
            .collect();
        Cow::Owned(Raster { width: self.width, height: self.height, channels: 1, data })
    }

    /// sub-raster covering [x0, x1) x [y0, y1), clamped to the raster
    pub fn crop(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Raster {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        let x0 = x0.min(x1);
        let y0 = y0.min(y1);
        let c = self.channels as usize;
        let mut data = Vec::with_capacity((x1 - x0) as usize * (y1 - y0) as usize * c);
        for y in y0..y1 {
            let row = (y as usize * self.width as usize + x0 as usize) * c;
            data.extend_from_slice(&self.data[row..row + (x1 - x0) as usize * c]);
        }
        Raster { width: x1 - x0, height: y1 - y0, channels: self.channels, data }
    }

    /// copy `src` into this raster with its top-left corner at (x0, y0).
    /// parts falling outside are clipped; channel layouts are converted to ours.
    pub fn paste(&mut self, src: &Raster, x0: u32, y0: u32) {
        let src = match self.channels {
            1 => src.to_gray(),
            _ => src.to_rgb(),
        };
        let c = self.channels as usize;
        let sc = src.channels as usize;
        for sy in 0..src.height {
            let y = y0 + sy;
            if y >= self.height {
                break;
            }
            for sx in 0..src.width {
                let x = x0 + sx;
                if x >= self.width {
                    break;
                }
                let s = (sy as usize * src.width as usize + sx as usize) * sc;
                let d = (y as usize * self.width as usize + x as usize) * c;
                let n = sc.min(c);
                self.data[d..d + n].copy_from_slice(&src.data[s..s + n]);
            }
        }
    }

    /// bring two rasters to a common channel layout: grey if either is grey, RGB otherwise
    pub fn common_format<'a>(a: &'a Raster, b: &'a Raster) -> (Cow<'a, Raster>, Cow<'a, Raster>) {
        if a.channels == 1 || b.channels == 1 {
            (a.to_gray(), b.to_gray())
        } else {
            (a.to_rgb(), b.to_rgb())
        }
    }

    pub fn same_size(&self, other: &Raster) -> bool {
        self.width == other.width && self.height == other.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_length() {
        assert!(Raster::new(2, 2, 3, vec![0; 11]).is_err());
        assert!(Raster::new(2, 2, 3, vec![0; 12]).is_ok());
        assert!(Raster::new(2, 2, 2, vec![0; 8]).is_err());
    }

    #[test]
    fn test_filled_channel_count() {
        let empty = Raster::filled(3, 2, &[]);
        assert_eq!(empty.channels(), 1);
        assert_eq!(empty.data(), &[0; 6]);
        let wide = Raster::filled(1, 1, &[1, 2, 3, 4, 5]);
        assert_eq!(wide.channels(), 4);
        assert_eq!(wide.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_gray_and_rgb_conversions() {
        let rgb = Raster::new(1, 1, 3, vec![30, 60, 90]).unwrap();
        let gray = rgb.to_gray();
        assert_eq!(gray.channels(), 1);
        assert_eq!(gray.data(), &[60]);
        let back = gray.to_rgb();
        assert_eq!(back.data(), &[60, 60, 60]);
    }

    #[test]
    fn test_common_format_prefers_gray() {
        let rgb = Raster::filled(2, 2, &[10, 20, 30]);
        let gray = Raster::filled(2, 2, &[5]);
        let (a, b) = Raster::common_format(&rgb, &gray);
        assert_eq!(a.channels(), 1);
        assert_eq!(b.channels(), 1);
    }

    #[test]
    fn test_crop_and_paste() {
        let mut canvas = Raster::filled(4, 4, &[255, 255, 255]);
        let patch = Raster::filled(2, 2, &[1, 2, 3]);
        canvas.paste(&patch, 3, 3);
        assert_eq!(canvas.rgb_at(3, 3), [1, 2, 3]);
        assert_eq!(canvas.rgb_at(2, 2), [255, 255, 255]);

        let cropped = canvas.crop(2, 2, 10, 10);
        assert_eq!((cropped.width(), cropped.height()), (2, 2));
        assert_eq!(cropped.rgb_at(1, 1), [1, 2, 3]);
    }
}
