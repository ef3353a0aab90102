//! [src/bmp.rs]
//! APARATO: BMP ENCODER
//! RESPONSABILIDAD: Renderiza una secuencia ordenada de triples RGB como BMP 24-bit.

const FILE_HEADER_SIZE: u32 = 14;
const DIB_HEADER_SIZE: u32 = 40;
const PIXEL_DATA_OFFSET: u32 = FILE_HEADER_SIZE + DIB_HEADER_SIZE;
const BITS_PER_PIXEL: u16 = 24;
const PIXELS_PER_METER: i32 = 2835; // 72 dpi in SI units, matches the original encoder.

/// Encodes `pixels` (each component in `[0, 1]`) as a little-endian 24-bit BMP.
///
/// Lays the pixels out row-major into a square-ish `width x height` image
/// (`width = ceil(sqrt(n))`, `height = ceil(n / width)`), padding unused trailing
/// pixels with black. Returns an empty byte string for empty input.
pub fn encode(pixels: &[(f64, f64, f64)]) -> Vec<u8> {
    let count = pixels.len();
    if count == 0 {
        return Vec::new();
    }

    let width = (count as f64).sqrt().ceil() as u32;
    let height = (count as f64 / width as f64).ceil() as u32;
    let row_stride = ((width * 3 + 3) / 4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = PIXEL_DATA_OFFSET + pixel_array_size;

    let mut out = Vec::with_capacity(file_size as usize);
    write_file_header(&mut out, file_size);
    write_dib_header(&mut out, width, height, pixel_array_size);
    write_pixel_array(&mut out, pixels, width, height, row_stride);
    out
}

fn write_file_header(out: &mut Vec<u8>, file_size: u32) {
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // reserved1
    out.extend_from_slice(&0u16.to_le_bytes()); // reserved2
    out.extend_from_slice(&PIXEL_DATA_OFFSET.to_le_bytes());
}

fn write_dib_header(out: &mut Vec<u8>, width: u32, height: u32, pixel_array_size: u32) {
    out.extend_from_slice(&DIB_HEADER_SIZE.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(-(height as i32)).to_le_bytes()); // negative: top-down rows
    out.extend_from_slice(&1u16.to_le_bytes()); // planes
    out.extend_from_slice(&BITS_PER_PIXEL.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // compression: none
    out.extend_from_slice(&pixel_array_size.to_le_bytes());
    out.extend_from_slice(&PIXELS_PER_METER.to_le_bytes());
    out.extend_from_slice(&PIXELS_PER_METER.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // colors used
    out.extend_from_slice(&0u32.to_le_bytes()); // important colors
}

fn write_pixel_array(out: &mut Vec<u8>, pixels: &[(f64, f64, f64)], width: u32, height: u32, row_stride: u32) {
    let count = pixels.len();
    for y in 0..height {
        let row_start = out.len();
        for x in 0..width {
            let index = (y * width + x) as usize;
            if index < count {
                let (r, g, b) = pixels[index];
                out.push(quantize(b));
                out.push(quantize(g));
                out.push(quantize(r));
            } else {
                out.extend_from_slice(&[0, 0, 0]);
            }
        }
        let written = out.len() - row_start;
        out.resize(row_start + row_stride as usize, 0);
        debug_assert!(written <= row_stride as usize);
    }
}

fn quantize(channel: f64) -> u8 {
    (channel * 255.0).floor().clamp(0.0, 255.0) as u8
}
