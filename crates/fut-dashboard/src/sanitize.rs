//! Cleaning of server-provided strings before they reach the terminal.
//!
//! Build names and failure messages come straight from the backend and end up
//! in list rows and alert dialogs. Escape sequences in them would repaint the
//! UI, so they are dropped along with control and bidi formatting characters.

use std::iter::Peekable;
use std::str::Chars;

pub const MAX_MESSAGE_CHARS: usize = 2048;
pub const MAX_NAME_CHARS: usize = 256;

const TRUNCATED_SUFFIX: &str = "...[truncated]";

/// Strips escapes and control characters; keeps newlines when `multiline`.
pub fn sanitize_text(input: &str, max_chars: usize, multiline: bool) -> String {
    let mut out = String::with_capacity(input.len().min(max_chars));
    let mut count = 0usize;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            skip_escape(&mut chars);
            continue;
        }
        let keep = match c {
            '\n' if multiline => Some('\n'),
            '\t' => Some(' '),
            '\r' | '\n' => None,
            c if c.is_control() || is_bidi_control(c) => None,
            c => Some(c),
        };
        let Some(k) = keep else {
            continue;
        };
        if count == max_chars {
            out.push_str(TRUNCATED_SUFFIX);
            break;
        }
        out.push(k);
        count += 1;
    }
    out
}

pub fn sanitize_message(input: &str) -> String {
    sanitize_text(input, MAX_MESSAGE_CHARS, true).trim().to_string()
}

pub fn sanitize_name(input: &str) -> String {
    sanitize_text(input, MAX_NAME_CHARS, false)
}

fn skip_escape(chars: &mut Peekable<Chars<'_>>) {
    match chars.next() {
        // CSI: parameters until a final byte in '@'..='~'.
        Some('[') => {
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        }
        // OSC: terminated by BEL or ST.
        Some(']') => skip_until_st(chars, true),
        // DCS, SOS, PM, APC: terminated by ST.
        Some('P' | 'X' | '^' | '_') => skip_until_st(chars, false),
        _ => {}
    }
}

fn skip_until_st(chars: &mut Peekable<Chars<'_>>, bel_terminates: bool) {
    while let Some(c) = chars.next() {
        if bel_terminates && c == '\x07' {
            return;
        }
        if c == '\x1b' && chars.peek() == Some(&'\\') {
            chars.next();
            return;
        }
    }
}

fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{061C}' | '\u{200E}' | '\u{200F}')
        || ('\u{202A}'..='\u{202E}').contains(&c)
        || ('\u{2066}'..='\u{2069}').contains(&c)
}
