//! Reader and writer for the NPY array file format.
//!
//! Layout: the magic string `\x93NUMPY`, a major and minor version byte, the
//! header length (u16 LE for version 1, u32 LE for versions 2 and 3), then an
//! ASCII dict literal such as
//! `{'descr': '<f4', 'fortran_order': False, 'shape': (2, 3), }` padded to a
//! 64-byte boundary, then the raw elements.

use thiserror::Error;

use crate::domain::models::{ArrayData, DType, NdArray, ShapeMismatch};

const MAGIC: &[u8] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

/// NPY codec errors
#[derive(Debug, Error)]
pub enum NpyError {
    #[error("missing NPY magic string")]
    BadMagic,

    #[error("unsupported NPY version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    #[error("NPY data is truncated")]
    Truncated,

    #[error("malformed NPY header: {0}")]
    Header(String),

    #[error("unsupported dtype '{0}'")]
    UnsupportedDType(String),

    #[error("Fortran-ordered arrays are not supported")]
    FortranOrder,

    #[error(transparent)]
    Shape(#[from] ShapeMismatch),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

struct Header {
    dtype: DType,
    endian: Endian,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Parse an NPY byte buffer
pub fn read_npy(bytes: &[u8]) -> Result<NdArray, NpyError> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(NpyError::BadMagic);
    }
    let (major, minor) = (bytes[6], bytes[7]);
    let (header_len, header_start): (usize, usize) = match major {
        1 => {
            let raw = bytes.get(8..10).ok_or(NpyError::Truncated)?;
            (usize::from(u16::from_le_bytes([raw[0], raw[1]])), 10)
        }
        2 | 3 => {
            let raw = bytes.get(8..12).ok_or(NpyError::Truncated)?;
            let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            let len = usize::try_from(len).map_err(|_| NpyError::Truncated)?;
            (len, 12)
        }
        _ => return Err(NpyError::UnsupportedVersion(major, minor)),
    };

    let header_end = header_start
        .checked_add(header_len)
        .ok_or(NpyError::Truncated)?;
    let header_bytes = bytes
        .get(header_start..header_end)
        .ok_or(NpyError::Truncated)?;
    let header_text = std::str::from_utf8(header_bytes)
        .map_err(|e| NpyError::Header(format!("header is not UTF-8: {e}")))?;
    let header = parse_header(header_text)?;
    if header.fortran_order {
        return Err(NpyError::FortranOrder);
    }

    let body_len = header
        .shape
        .iter()
        .try_fold(header.dtype.item_size(), |len, dim| len.checked_mul(*dim))
        .ok_or_else(|| NpyError::Header(format!("shape {:?} overflows", header.shape)))?;
    let body_end = header_end.checked_add(body_len).ok_or(NpyError::Truncated)?;
    let body = bytes.get(header_end..body_end).ok_or(NpyError::Truncated)?;

    let data = decode_elements(body, header.dtype, header.endian);
    Ok(NdArray::new(header.shape, data)?)
}

/// Serialize an array as NPY version 1.0, little endian, C order
pub fn write_npy(array: &NdArray) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        descr(array.dtype()),
        format_shape(array.shape())
    );

    // magic + version + u16 length + dict + padding + newline
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    let header_len = dict.len() + padding + 1;

    let mut out = Vec::with_capacity(unpadded + padding + array.len() * array.dtype().item_size());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&u16::try_from(header_len).unwrap_or(u16::MAX).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend(std::iter::repeat(b' ').take(padding));
    out.push(b'\n');
    encode_elements(array.data(), &mut out);
    out
}

fn parse_header(text: &str) -> Result<Header, NpyError> {
    let descr = dict_value(text, "descr")?;
    let descr = descr
        .strip_prefix('\'')
        .and_then(|d| d.split('\'').next())
        .ok_or_else(|| NpyError::Header(format!("descr is not a string: {descr}")))?;
    let (dtype, endian) = parse_descr(descr)?;

    let fortran_order = match dict_value(text, "fortran_order")? {
        v if v.starts_with("True") => true,
        v if v.starts_with("False") => false,
        other => return Err(NpyError::Header(format!("bad fortran_order: {other}"))),
    };

    let shape_text = dict_value(text, "shape")?;
    let inner = shape_text
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .ok_or_else(|| NpyError::Header(format!("shape is not a tuple: {shape_text}")))?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| {
            dim.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| NpyError::Header(format!("bad dimension '{dim}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Header {
        dtype,
        endian,
        fortran_order,
        shape,
    })
}

/// Text following `'key':` in the header dict, left-trimmed
fn dict_value<'a>(text: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let needle = format!("'{key}'");
    let start = text
        .find(&needle)
        .ok_or_else(|| NpyError::Header(format!("missing key '{key}'")))?;
    let rest = text[start + needle.len()..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| NpyError::Header(format!("missing ':' after '{key}'")))?;
    Ok(rest.trim_start())
}

fn parse_descr(descr: &str) -> Result<(DType, Endian), NpyError> {
    let unsupported = || NpyError::UnsupportedDType(descr.to_string());
    let mut chars = descr.chars();
    let endian = match chars.next().ok_or_else(unsupported)? {
        '<' | '|' | '=' => Endian::Little,
        '>' => Endian::Big,
        _ => return Err(unsupported()),
    };
    let dtype = match chars.as_str() {
        "b1" => DType::Bool,
        "u1" => DType::Uint8,
        "i4" => DType::Int32,
        "i8" => DType::Int64,
        "f4" => DType::Float32,
        "f8" => DType::Float64,
        _ => return Err(unsupported()),
    };
    Ok((dtype, endian))
}

const fn descr(dtype: DType) -> &'static str {
    match dtype {
        DType::Bool => "|b1",
        DType::Uint8 => "|u1",
        DType::Int32 => "<i4",
        DType::Int64 => "<i8",
        DType::Float32 => "<f4",
        DType::Float64 => "<f8",
    }
}

fn format_shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => {
            let joined = dims
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("({joined})")
        }
    }
}

macro_rules! decode_as {
    ($body:expr, $ty:ty, $endian:expr) => {{
        const N: usize = std::mem::size_of::<$ty>();
        $body
            .chunks_exact(N)
            .map(|chunk| {
                let mut raw = [0u8; N];
                raw.copy_from_slice(chunk);
                match $endian {
                    Endian::Little => <$ty>::from_le_bytes(raw),
                    Endian::Big => <$ty>::from_be_bytes(raw),
                }
            })
            .collect::<Vec<$ty>>()
    }};
}

fn decode_elements(body: &[u8], dtype: DType, endian: Endian) -> ArrayData {
    match dtype {
        DType::Bool => ArrayData::Bool(body.iter().map(|b| *b != 0).collect()),
        DType::Uint8 => ArrayData::Uint8(body.to_vec()),
        DType::Int32 => ArrayData::Int32(decode_as!(body, i32, endian)),
        DType::Int64 => ArrayData::Int64(decode_as!(body, i64, endian)),
        DType::Float32 => ArrayData::Float32(decode_as!(body, f32, endian)),
        DType::Float64 => ArrayData::Float64(decode_as!(body, f64, endian)),
    }
}

fn encode_elements(data: &ArrayData, out: &mut Vec<u8>) {
    match data {
        ArrayData::Bool(values) => out.extend(values.iter().map(|b| u8::from(*b))),
        ArrayData::Uint8(values) => out.extend_from_slice(values),
        ArrayData::Int32(values) => values.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes())),
        ArrayData::Int64(values) => values.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes())),
        ArrayData::Float32(values) => values.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes())),
        ArrayData::Float64(values) => values.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes())),
    }
}
