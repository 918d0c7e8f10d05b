//! Minimal format renderer
//!
//! Kernel diagnostic output understands `%d`, `%x`, `%p`, `%s` and `%%`,
//! nothing more. Arguments are passed as an explicit ordered list of
//! tagged [`FmtArg`] values and matched against the conversions
//! positionally, so an arity or type mismatch is a reported error rather
//! than undefined behavior.

/// One renderer argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmtArg<'a> {
    /// Signed decimal, for `%d`.
    Int(i32),
    /// Unsigned hexadecimal, for `%x` / `%p`.
    Hex(u32),
    /// Address-sized hexadecimal, for `%p` / `%x`.
    Ptr(usize),
    /// Text for `%s`; `None` renders as `(null)`.
    Str(Option<&'a str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmtError {
    /// A conversion had no argument left to consume.
    MissingArgument { at: usize },
    /// The argument at this position does not fit the conversion.
    WrongType { at: usize, conversion: char },
    /// Arguments were supplied beyond the last conversion.
    UnusedArguments { taken: usize, given: usize },
}

/// Walk `fmt` left to right, feeding rendered bytes to `out`.
///
/// A lone `%` at the end of the format terminates rendering; an unknown
/// conversion character is passed through prefixed by `%` as a visible
/// diagnostic and consumes no argument.
pub fn render(
    fmt: &str,
    args: &[FmtArg],
    mut out: impl FnMut(u8),
) -> Result<(), FmtError> {
    let bytes = fmt.as_bytes();
    let mut next = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i];
        i += 1;
        if c != b'%' {
            out(c);
            continue;
        }
        if i >= bytes.len() {
            break;
        }
        let conv = bytes[i];
        i += 1;
        match conv {
            b'd' => match take(args, &mut next, 'd')? {
                FmtArg::Int(v) => put_decimal(*v, &mut out),
                _ => return Err(FmtError::WrongType {
                    at: next - 1,
                    conversion: 'd',
                }),
            },
            b'x' | b'p' => match take(args, &mut next, conv as char)? {
                FmtArg::Hex(v) => put_hex(u64::from(*v), &mut out),
                FmtArg::Ptr(v) => put_hex(*v as u64, &mut out),
                _ => return Err(FmtError::WrongType {
                    at: next - 1,
                    conversion: conv as char,
                }),
            },
            b's' => match take(args, &mut next, 's')? {
                FmtArg::Str(Some(s)) => {
                    for &b in s.as_bytes() {
                        out(b);
                    }
                }
                FmtArg::Str(None) => {
                    for &b in b"(null)" {
                        out(b);
                    }
                }
                _ => return Err(FmtError::WrongType {
                    at: next - 1,
                    conversion: 's',
                }),
            },
            b'%' => out(b'%'),
            other => {
                // unknown conversion, printed verbatim to draw attention
                out(b'%');
                out(other);
            }
        }
    }

    if next < args.len() {
        return Err(FmtError::UnusedArguments {
            taken: next,
            given: args.len(),
        });
    }
    Ok(())
}

fn take<'f, 'a>(
    args: &'f [FmtArg<'a>],
    next: &mut usize,
    conversion: char,
) -> Result<&'f FmtArg<'a>, FmtError> {
    let _ = conversion;
    let arg = args
        .get(*next)
        .ok_or(FmtError::MissingArgument { at: *next })?;
    *next += 1;
    Ok(arg)
}

fn put_decimal(v: i32, out: &mut impl FnMut(u8)) {
    if v < 0 {
        out(b'-');
    }
    // unsigned_abs keeps i32::MIN exact instead of overflowing on negation
    put_radix(u64::from(v.unsigned_abs()), 10, out);
}

fn put_hex(v: u64, out: &mut impl FnMut(u8)) {
    put_radix(v, 16, out);
}

fn put_radix(mut x: u64, base: u64, out: &mut impl FnMut(u8)) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut buf = [0u8; 20];
    let mut i = 0;
    loop {
        buf[i] = DIGITS[(x % base) as usize];
        i += 1;
        x /= base;
        if x == 0 {
            break;
        }
    }
    while i > 0 {
        i -= 1;
        out(buf[i]);
    }
}
