//! SMTP reply and capability parsing.

use crate::error::{Error, Result};
use crate::types::{Capability, CapabilitySet, Reply, ReplyCode};

/// Parses an SMTP reply from raw response lines.
///
/// Lines may still carry their CRLF terminator. SMTP replies are single- or
/// multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First\r\n250-Second\r\n250 Last\r\n`
///
/// # Errors
///
/// Returns a protocol error if the reply is empty or any line is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let first = lines
        .first()
        .ok_or_else(|| Error::Protocol("empty reply".into()))?;

    let code = reply_code(first)?;
    let mut text = Vec::with_capacity(lines.len());
    for line in lines {
        let line = line.trim_end_matches(['\r', '\n']);
        if reply_code(line)? != code {
            return Err(Error::Protocol(format!(
                "reply code changed mid-reply: {line:?}"
            )));
        }
        // Strip "250-" / "250 "; a bare "250" carries no text.
        text.push(line.get(4..).unwrap_or("").to_string());
    }

    Ok(Reply::new(ReplyCode::new(code), text))
}

/// Returns true if this line terminates a (possibly multi-line) reply.
///
/// Continuation lines use `-` after the code; the final line uses a space or
/// carries nothing but the code.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    let line = line.trim_end_matches(['\r', '\n']);
    line.len() < 4 || line.as_bytes()[3] == b' '
}

/// Builds the capability set from a parsed EHLO reply.
///
/// The first line is the server's name and is skipped; every following line
/// is one capability (see [`Capability::parse`]).
///
/// # Errors
///
/// Returns a protocol error if any capability line is malformed; in that
/// case no partial set is produced.
pub fn parse_capabilities(reply: &Reply) -> Result<CapabilitySet> {
    let mut set = CapabilitySet::new();
    for line in reply.lines.iter().skip(1) {
        set.insert(Capability::parse(line)?);
    }
    Ok(set)
}

fn reply_code(line: &str) -> Result<u16> {
    let line = line.trim_end_matches(['\r', '\n']);
    // get() also rejects a third byte inside a multibyte character.
    let code = line
        .get(..3)
        .ok_or_else(|| Error::Protocol(format!("malformed reply line: {line:?}")))?;
    code.parse()
        .map_err(|_| Error::Protocol(format!("invalid reply code: {line:?}")))
}
