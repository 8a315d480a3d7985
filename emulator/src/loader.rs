//! Load programs from the LS-8 text object format.
//!
//! Each line holds one byte written in base 2, optionally followed by a `#`
//! comment. Lines that hold no byte, or something that is not a base 2
//! byte, are skipped.

use camino::{Utf8Path, Utf8PathBuf};
use nom::{
    bytes::complete::{tag_no_case, take_while1},
    combinator::{all_consuming, map_res, opt},
    sequence::preceded,
    Finish, IResult,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::Word;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read program {path}")]
    Io {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("program contains no instruction")]
    Empty,
}

/// Parse a base 2 number
fn from_binary(input: &str) -> Result<Word, std::num::ParseIntError> {
    Word::from_str_radix(input, 2)
}

/// Check if character is a binary digit
fn is_bin_digit(c: char) -> bool {
    c.is_digit(2)
}

/// Parse a byte, with an optional `0b` prefix
fn parse_byte(input: &str) -> IResult<&str, Word> {
    map_res(
        preceded(opt(tag_no_case("0b")), take_while1(is_bin_digit)),
        from_binary,
    )(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    /// Nothing but whitespace and comments
    Blank,
    Byte(Word),
    Invalid(&'a str),
}

fn parse_line(line: &str) -> Line<'_> {
    let code = line.split_once('#').map_or(line, |(code, _comment)| code);
    let code = code.trim();
    if code.is_empty() {
        return Line::Blank;
    }

    match all_consuming(parse_byte)(code).finish() {
        Ok((_, byte)) => Line::Byte(byte),
        Err(_) => Line::Invalid(code),
    }
}

/// Parse a program from its text representation
///
/// # Errors
///
/// Fails if the source does not contain a single byte.
pub fn parse_program(source: &str) -> Result<Vec<Word>, LoadError> {
    let mut program = Vec::new();

    for (number, line) in source.lines().enumerate() {
        match parse_line(line) {
            Line::Blank => {}
            Line::Byte(byte) => program.push(byte),
            Line::Invalid(content) => {
                warn!(line = number + 1, content, "Skipping line that is not a byte");
            }
        }
    }

    if program.is_empty() {
        return Err(LoadError::Empty);
    }

    debug!(size = program.len(), "Parsed program");
    Ok(program)
}

/// Read and parse a program file
///
/// # Errors
///
/// Fails if the file cannot be read or does not contain a single byte.
#[tracing::instrument]
pub fn load_file(path: &Utf8Path) -> Result<Vec<Word>, LoadError> {
    info!("Reading program");
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;
    parse_program(&source)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn from_binary_test() {
        assert_eq!(from_binary("10"), Ok(0b10));
        assert_eq!(from_binary("11111111"), Ok(0xFF)); // Upper boundary
        assert!(from_binary("100000000").is_err()); // Out of bounds
        assert!(from_binary("12").is_err());
    }

    #[test]
    fn parse_byte_test() {
        assert_eq!(parse_byte("10000010"), Ok(("", 0x82)));
        assert_eq!(parse_byte("0b101"), Ok(("", 5)));
        assert_eq!(parse_byte("0B101"), Ok(("", 5)));
        assert_eq!(parse_byte("01 rest"), Ok((" rest", 1)));
        // Only the leading zero is a binary digit
        assert_eq!(parse_byte("0x42"), Ok(("x42", 0)));
        assert!(parse_byte("foo").is_err());
    }

    #[test]
    fn parse_line_test() {
        assert_eq!(parse_line("10000010 # LDI R0,8"), Line::Byte(0x82));
        assert_eq!(parse_line("  00000001  "), Line::Byte(1));
        assert_eq!(parse_line("00001000#no space"), Line::Byte(8));
        assert_eq!(parse_line(""), Line::Blank);
        assert_eq!(parse_line("# print8.ls8"), Line::Blank);
        assert_eq!(parse_line("   \t"), Line::Blank);
        assert_eq!(parse_line("hello # world"), Line::Invalid("hello"));
        assert_eq!(parse_line("0101 0101"), Line::Invalid("0101 0101"));
        assert_eq!(parse_line("0x42 # hex"), Line::Invalid("0x42"));
        assert_eq!(parse_line("100000000"), Line::Invalid("100000000"));
    }

    #[test]
    fn parse_program_test() {
        let source = indoc! {"
            # print8.ls8: print the number 8 on the screen

            10000010 # LDI R0,8
            00000000
            00001000
            01000111 # PRN R0
            00000000
            not a byte
            00000001 # HLT
        "};

        assert_eq!(
            parse_program(source).unwrap(),
            vec![0x82, 0x00, 0x08, 0x47, 0x00, 0x01]
        );
    }

    #[test]
    fn empty_program_test() {
        assert!(matches!(parse_program(""), Err(LoadError::Empty)));
        assert!(matches!(
            parse_program("# only comments\n\nfoo\n"),
            Err(LoadError::Empty)
        ));
    }

    #[test]
    fn missing_file_test() {
        let res = load_file(Utf8Path::new("this/file/does/not/exist.ls8"));
        assert!(matches!(res, Err(LoadError::Io { .. })));
    }
}
