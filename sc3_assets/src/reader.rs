//! Little-endian primitive readers/writers shared by the model and animation formats.

use std::io::{self, Read, Write};

use glam::{Quat, Vec2, Vec3};

pub(crate) fn read_exact_array<const N: usize, R: Read>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

pub(crate) fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    Ok(read_exact_array::<1, _>(reader)?[0])
}

pub(crate) fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    Ok(u16::from_le_bytes(read_exact_array::<2, _>(reader)?))
}

pub(crate) fn read_i16<R: Read>(reader: &mut R) -> io::Result<i16> {
    Ok(i16::from_le_bytes(read_exact_array::<2, _>(reader)?))
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    Ok(u32::from_le_bytes(read_exact_array::<4, _>(reader)?))
}

pub(crate) fn read_f32<R: Read>(reader: &mut R) -> io::Result<f32> {
    Ok(f32::from_le_bytes(read_exact_array::<4, _>(reader)?))
}

pub(crate) fn read_vec2<R: Read>(reader: &mut R) -> io::Result<Vec2> {
    Ok(Vec2::new(read_f32(reader)?, read_f32(reader)?))
}

pub(crate) fn read_vec3<R: Read>(reader: &mut R) -> io::Result<Vec3> {
    Ok(Vec3::new(read_f32(reader)?, read_f32(reader)?, read_f32(reader)?))
}

/// Quaternions are stored x, y, z, w.
pub(crate) fn read_quat<R: Read>(reader: &mut R) -> io::Result<Quat> {
    Ok(Quat::from_xyzw(
        read_f32(reader)?,
        read_f32(reader)?,
        read_f32(reader)?,
        read_f32(reader)?,
    ))
}

pub(crate) fn write_u16<W: Write>(writer: &mut W, value: u16) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_i16<W: Write>(writer: &mut W, value: i16) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_u32<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_f32<W: Write>(writer: &mut W, value: f32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_vec3<W: Write>(writer: &mut W, value: Vec3) -> io::Result<()> {
    for c in value.to_array() {
        write_f32(writer, c)?;
    }
    Ok(())
}

pub(crate) fn write_quat<W: Write>(writer: &mut W, value: Quat) -> io::Result<()> {
    for c in value.to_array() {
        write_f32(writer, c)?;
    }
    Ok(())
}

/// Caps up-front allocations driven by counts read from the file, so a corrupt
/// header fails with `Truncated` instead of exhausting memory.
pub(crate) fn capacity_hint(count: usize) -> usize {
    count.min(1 << 16)
}
