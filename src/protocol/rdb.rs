use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use bytes::Bytes;

use crate::store::now_ms;

const MAGIC: &[u8] = b"REDIS0012";

const OP_AUX: u8 = 0xFA;
const OP_RESIZE_DB: u8 = 0xFB;
const OP_EXPIRE_MS: u8 = 0xFC;
const OP_EXPIRE_S: u8 = 0xFD;
const OP_SELECT_DB: u8 = 0xFE;
const OP_EOF: u8 = 0xFF;
const TYPE_STRING: u8 = 0x00;

/// One string key as it appears in the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RdbRecord {
    pub key: Bytes,
    pub value: Bytes,
    pub expires_at_ms: Option<u64>,
}

// ---- writer ----

/// Serializes the string keyspace in the on-disk layout:
/// magic, db selector, hash-table sizes, then `[expiry] type key value`
/// per record, then EOF.
pub fn serialize(records: &[RdbRecord]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.push(OP_SELECT_DB);
    buf.push(0x00);
    buf.push(OP_RESIZE_DB);
    write_length(&mut buf, records.len() as u32);
    let with_ttl = records.iter().filter(|r| r.expires_at_ms.is_some()).count();
    write_length(&mut buf, with_ttl as u32);
    for record in records {
        if let Some(expiry) = record.expires_at_ms {
            buf.push(OP_EXPIRE_MS);
            buf.extend_from_slice(&expiry.to_le_bytes());
        }
        buf.push(TYPE_STRING);
        write_string(&mut buf, &record.key);
        write_string(&mut buf, &record.value);
    }
    buf.push(OP_EOF);
    buf
}

/// Writes the snapshot to `path` via a temp file in the same directory, so a
/// crash mid-write never leaves a torn snapshot behind.
pub fn save_to_file(path: &Path, records: &[RdbRecord]) -> Result<()> {
    let tmp = path.with_extension("rdb.tmp");
    fs::write(&tmp, serialize(records))
        .with_context(|| format!("writing snapshot temp file {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming snapshot into {:?}", path))?;
    Ok(())
}

fn write_length(buf: &mut Vec<u8>, len: u32) {
    if len < 0x40 {
        buf.push(len as u8);
    } else if len < 0x4000 {
        buf.push(0x40 | (len >> 8) as u8);
        buf.push((len & 0xFF) as u8);
    } else {
        buf.push(0x80);
        buf.extend_from_slice(&len.to_be_bytes());
    }
}

fn write_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_length(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

// ---- reader ----

pub enum LengthEncoding {
    Len(u32),
    Int8(i8),
    Int16(i16),
    Int32(i32),
}

/// Loads the string subset of a snapshot file. Keys whose expiry already
/// passed are dropped here rather than inserted dead.
pub fn load_file(path: &Path) -> Result<Vec<RdbRecord>> {
    let file = fs::File::open(path).with_context(|| format!("opening snapshot {:?}", path))?;
    load(&mut BufReader::new(file))
}

pub fn load<R: Read>(reader: &mut R) -> Result<Vec<RdbRecord>> {
    let mut header = [0u8; 9];
    reader.read_exact(&mut header).context("snapshot header")?;
    if !header.starts_with(b"REDIS") {
        bail!("invalid snapshot header: {:?}", header);
    }

    let mut records = Vec::new();
    let mut pending_expiry_ms = None;
    loop {
        let op = match read_byte(reader) {
            Ok(op) => op,
            // EOF without the 0xFF marker; accept what was read
            Err(_) => return Ok(records),
        };
        match op {
            OP_AUX => {
                let _key = read_string(reader)?;
                let _value = read_string(reader)?;
            }
            OP_SELECT_DB => {
                read_length_value(reader)?;
            }
            OP_RESIZE_DB => {
                read_length_value(reader)?;
                read_length_value(reader)?;
            }
            OP_EXPIRE_S => {
                pending_expiry_ms = Some(read_u32(reader)? as u64 * 1000);
            }
            OP_EXPIRE_MS => {
                pending_expiry_ms = Some(read_u64(reader)?);
            }
            OP_EOF => {
                // trailing checksum is optional; consume whatever is left
                let mut checksum = [0u8; 8];
                let _ = reader.read_exact(&mut checksum);
                return Ok(records);
            }
            TYPE_STRING => {
                let key = read_string(reader)?;
                let value = read_string(reader)?;
                let expires_at_ms = pending_expiry_ms.take();
                match expires_at_ms {
                    Some(expiry) if now_ms() >= expiry => {} // dead on arrival
                    _ => records.push(RdbRecord { key, value, expires_at_ms }),
                }
            }
            _ => bail!("unsupported snapshot op: {:#04x}", op),
        }
    }
}

pub(crate) fn read_length<R: Read>(reader: &mut R) -> Result<LengthEncoding> {
    let head = read_byte(reader)?;
    match head & 0b1100_0000 {
        0b0000_0000 => Ok(LengthEncoding::Len((head & 0b0011_1111) as u32)),
        0b0100_0000 => {
            let low = read_byte(reader)?;
            Ok(LengthEncoding::Len(
                (((head & 0b0011_1111) as u32) << 8) | low as u32,
            ))
        }
        0b1000_0000 => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            Ok(LengthEncoding::Len(u32::from_be_bytes(buf)))
        }
        _ => match head & 0b0011_1111 {
            0 => Ok(LengthEncoding::Int8(read_byte(reader)? as i8)),
            1 => {
                let mut buf = [0u8; 2];
                reader.read_exact(&mut buf)?;
                Ok(LengthEncoding::Int16(i16::from_le_bytes(buf)))
            }
            2 => {
                let mut buf = [0u8; 4];
                reader.read_exact(&mut buf)?;
                Ok(LengthEncoding::Int32(i32::from_le_bytes(buf)))
            }
            other => bail!("unsupported string encoding: {}", other),
        },
    }
}

fn read_length_value<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(match read_length(reader)? {
        LengthEncoding::Len(len) => len,
        LengthEncoding::Int8(v) => v as u32,
        LengthEncoding::Int16(v) => v as u32,
        LengthEncoding::Int32(v) => v as u32,
    })
}

/// Reads a string payload; the special integer encodings decode to their
/// decimal ASCII form.
pub(crate) fn read_string<R: Read>(reader: &mut R) -> Result<Bytes> {
    Ok(match read_length(reader)? {
        LengthEncoding::Len(len) => {
            let mut buf = vec![0u8; len as usize];
            reader.read_exact(&mut buf)?;
            Bytes::from(buf)
        }
        LengthEncoding::Int8(v) => Bytes::from(v.to_string()),
        LengthEncoding::Int16(v) => Bytes::from(v.to_string()),
        LengthEncoding::Int32(v) => Bytes::from(v.to_string()),
    })
}

pub(crate) fn read_byte<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
