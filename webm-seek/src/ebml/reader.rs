use super::schema::{self, GLOBAL};
use super::{Element, TagEvent};
use crate::error::{Error, Result};
use bytes::Bytes;

/// Decodes a byte buffer into a sequence of [`TagEvent`]s.
///
/// `base` is the absolute file offset of the first byte of the buffer, so
/// separately fetched ranges report real file positions. Iteration stops
/// quietly at the first element that does not fit in the buffer; containers
/// still open at that point are never closed.
#[derive(Debug)]
pub struct TagReader {
    data: Bytes,
    base: u64,
    pos: usize,
    stack: Vec<Open>,
    done: bool,
}

#[derive(Debug)]
struct Open {
    element: Element,
    level: u8,
}

#[derive(Debug, Clone, Copy)]
struct Header {
    id: u32,
    size: Option<u64>,
    len: usize,
}

impl TagReader {
    pub fn new(data: Bytes, base: u64) -> Self {
        TagReader {
            data,
            base,
            pos: 0,
            stack: Vec::new(),
            done: false,
        }
    }

    fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    fn header(&self) -> Result<Option<Header>> {
        let rest = &self.data[self.pos..];
        let (id, id_len) = match read_id(rest)? {
            Some(id) => id,
            None => return Ok(None),
        };
        let (size, size_len) = match read_size(&rest[id_len..])? {
            Some(size) => size,
            None => return Ok(None),
        };

        Ok(Some(Header {
            id,
            size,
            len: id_len + size_len,
        }))
    }

    fn close_top(&mut self, end: Option<u64>) -> Option<Result<TagEvent>> {
        let mut open = self.stack.pop()?;
        if open.element.end.is_none() {
            open.element.end = end;
        }

        Some(Ok(TagEvent::End(open.element)))
    }

    fn read_next(&mut self) -> Result<Option<TagEvent>> {
        let offset = self.offset();
        let passed_end = self
            .stack
            .last()
            .and_then(|open| open.element.end)
            .is_some_and(|end| offset > end);
        if passed_end {
            return self.close_top(None).transpose();
        }

        if self.pos >= self.data.len() {
            return Ok(None);
        }

        let header = match self.header()? {
            Some(header) => header,
            None => return Ok(None),
        };

        let info = schema::lookup(header.id);
        if info.level != GLOBAL {
            // An unknown-size container ends where a sibling or an ancestor's
            // sibling begins.
            let sibling = self
                .stack
                .last()
                .is_some_and(|open| open.element.end.is_none() && open.level >= info.level);
            if sibling {
                return self.close_top(offset.checked_sub(1)).transpose();
            }
        }

        let data_start = offset + header.len as u64;
        let element = Element {
            id: header.id,
            name: info.name,
            kind: info.kind,
            start: offset,
            data_start,
            end: header
                .size
                .map(|size| data_start.saturating_add(size) - 1),
        };

        if info.kind.is_master() {
            self.pos += header.len;
            self.stack.push(Open {
                element: element.clone(),
                level: info.level,
            });
            return Ok(Some(TagEvent::Start(element)));
        }

        let size = header.size.ok_or_else(|| {
            Error::parse(format!("{} has an unknown size at {}", info.name, offset))
        })?;
        let payload_start = self.pos + header.len;
        let payload_end = match usize::try_from(size)
            .ok()
            .and_then(|size| payload_start.checked_add(size))
        {
            Some(end) if end <= self.data.len() => end,
            _ => return Ok(None),
        };

        self.pos = payload_end;
        let value = self.data.slice(payload_start..payload_end);
        Ok(Some(TagEvent::Value(element, value)))
    }
}

impl Iterator for TagReader {
    type Item = Result<TagEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let next = self.read_next().transpose();
        if !matches!(next, Some(Ok(_))) {
            self.done = true;
        }

        next
    }
}

/// Element ID with its length marker kept, 1 to 4 bytes.
fn read_id(buf: &[u8]) -> Result<Option<(u32, usize)>> {
    let first = match buf.first() {
        Some(b) => *b,
        None => return Ok(None),
    };

    let len = first.leading_zeros() as usize + 1;
    if len > 4 {
        return Err(Error::parse(format!("invalid element id lead byte {:#04x}", first)));
    }

    if buf.len() < len {
        return Ok(None);
    }

    let id = buf[..len].iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
    Ok(Some((id, len)))
}

/// Element data size, 1 to 8 bytes. All value bits set means unknown size.
fn read_size(buf: &[u8]) -> Result<Option<(Option<u64>, usize)>> {
    let first = match buf.first() {
        Some(b) => *b,
        None => return Ok(None),
    };

    if first == 0 {
        return Err(Error::parse("invalid element size lead byte 0x00"));
    }

    let len = first.leading_zeros() as usize + 1;
    if buf.len() < len {
        return Ok(None);
    }

    let value = buf[1..len]
        .iter()
        .fold(first as u64 & (0xff >> len), |acc, b| (acc << 8) | *b as u64);
    let unknown = (1u64 << (7 * len)) - 1;
    let size = if value == unknown { None } else { Some(value) };

    Ok(Some((size, len)))
}
