//! Bit-level decoders for packed vertex attribute formats.

/// Decode an IEEE 754 binary16 value.
///
/// Subnormals, infinities and NaN are reconstructed from the raw exponent
/// and mantissa fields.
pub fn f16_to_f32(bits: u16) -> f32 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = i32::from((bits >> 10) & 0x1F);
    let fraction = f32::from(bits & 0x03FF) / 1024.0;

    match exponent {
        0 => sign * 2f32.powi(-14) * fraction,
        0x1F if fraction != 0.0 => f32::NAN,
        0x1F => sign * f32::INFINITY,
        e => sign * 2f32.powi(e - 15) * (1.0 + fraction),
    }
}

/// Sign-extend the low 10 bits of `value` as a two's-complement integer.
#[inline]
pub fn sign_extend_10(value: u32) -> i32 {
    let v = (value & 0x3FF) as i32;
    if v & 0x200 != 0 { v - 0x400 } else { v }
}

/// Unpack a 10-10-10-2 signed-normalized vector (the 2-bit `w` is ignored).
pub fn unpack_snorm_10_10_10_2(packed: u32) -> [f32; 3] {
    [
        sign_extend_10(packed) as f32 / 511.0,
        sign_extend_10(packed >> 10) as f32 / 511.0,
        sign_extend_10(packed >> 20) as f32 / 511.0,
    ]
}
