//! Reply pagination.
//!
//! A reply's trailing text may be arbitrarily long and may contain line
//! breaks. Before it reaches the outbound queue it is split into messages
//! whose wire form, as relayed by the server with the bot's own prefix,
//! fits the 512 byte line limit.

use slirc_wire::{MAX_IRC_LINE_LEN, Message};

use crate::error::PaginationError;

/// Bytes available for the trailing text of `reply`.
///
/// Accounts for CRLF, `:<own_prefix> `, the command, every argument with its
/// separator, the ` :` marker and, for CTCP replies, the `\x01<ctcp> ..\x01`
/// framing. Negative when the preamble alone is too long.
pub fn max_trailing_len(own_prefix: &str, reply: &Message) -> isize {
    let mut used = 2 + own_prefix.len() + 2;
    if !reply.command.is_empty() {
        used += reply.command.len() + 1;
    }
    used += reply.args.iter().map(|arg| arg.len() + 1).sum::<usize>();
    used += 2;
    if let Some(ctcp) = reply.ctcp.as_deref().filter(|c| !c.is_empty()) {
        used += ctcp.len() + 3;
    }
    MAX_IRC_LINE_LEN as isize - used as isize
}

/// Split `reply` into messages that each fit on one line.
///
/// Every chunk keeps the reply's prefix, command, arguments and CTCP
/// command. Embedded line breaks always start a new message; longer lines
/// are cut at the last space inside the window (the space itself is
/// dropped) or, failing that, at the window edge.
pub fn paginate(own_prefix: &str, reply: Message) -> Result<Vec<Message>, PaginationError> {
    let max = max_trailing_len(own_prefix, &reply);
    if max < 0 {
        return Err(PaginationError::PreambleTooLong {
            overflow: max.unsigned_abs(),
        });
    }
    let max = max as usize;

    if reply.trailing.is_empty() {
        return Ok(vec![reply]);
    }
    if max == 0 {
        return Err(PaginationError::NoRoomForTrailing {
            len: reply.trailing.len(),
        });
    }

    let mut chunks = Vec::new();
    for line in reply.trailing.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        chunks.extend(split_line(line, max).ok_or(PaginationError::NoRoomForTrailing {
            len: line.len(),
        })?);
    }

    Ok(chunks
        .into_iter()
        .map(|text| Message {
            prefix: reply.prefix.clone(),
            command: reply.command.clone(),
            args: reply.args.clone(),
            trailing: text.to_string(),
            ctcp: reply.ctcp.clone(),
        })
        .collect())
}

/// Greedy word-boundary split of one line into pieces of at most `max` bytes.
///
/// Returns `None` when `max` cannot hold even a single character.
fn split_line(line: &str, max: usize) -> Option<Vec<&str>> {
    let mut pieces = Vec::new();
    let mut rest = line;

    while rest.len() > max {
        let cut = floor_char_boundary(rest, max);
        if cut == 0 {
            return None;
        }

        let space = if rest.as_bytes()[cut] == b' ' {
            Some(cut)
        } else {
            rest[..cut].rfind(' ').filter(|&i| i > 0)
        };

        match space {
            Some(i) => {
                pieces.push(&rest[..i]);
                rest = &rest[i + 1..];
            }
            None => {
                pieces.push(&rest[..cut]);
                rest = &rest[cut..];
            }
        }
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }
    Some(pieces)
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    (0..=index).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}
