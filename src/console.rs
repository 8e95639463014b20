/*
 * Minimal formatted console output. This is deliberately not built on
 * `core::fmt`: the wire format (`%s`, `%d`, `%x`, `%%`) and the exact byte
 * sequence produced for the INT_MIN case are part of the kernel's contract
 * with anyone staring at a serial console, not an implementation detail we
 * are free to delegate to a generic formatter.
 *
 * Author: Giuseppe Capasso <capassog97@gmail.com>
 */
use crate::firmware::console_putchar;

/// One formatted argument. The `%d`/`%x` split is carried by the variant,
/// not by the Rust type of the value, since both are native 32-bit words.
pub enum Arg<'a> {
    Str(&'a str),
    Signed(i32),
    Hex(u32),
}

/// Lets `kprintf!` accept bare values instead of requiring callers to wrap
/// every argument in `Arg` by hand.
pub trait IntoArg<'a> {
    fn into_arg(self) -> Arg<'a>;
}

impl<'a> IntoArg<'a> for &'a str {
    fn into_arg(self) -> Arg<'a> {
        Arg::Str(self)
    }
}

impl<'a> IntoArg<'a> for i32 {
    fn into_arg(self) -> Arg<'a> {
        Arg::Signed(self)
    }
}

impl<'a> IntoArg<'a> for u32 {
    fn into_arg(self) -> Arg<'a> {
        Arg::Hex(self)
    }
}

fn put_str(s: &str, emit: &mut impl FnMut(u8)) {
    for b in s.bytes() {
        emit(b);
    }
}

/// Prints the magnitude of a signed 32-bit value, handling `i32::MIN` by
/// doing the negation in unsigned arithmetic so it never overflows.
fn put_signed(value: i32, emit: &mut impl FnMut(u8)) {
    let magnitude: u32 = if value < 0 {
        emit(b'-');
        (value as i64).unsigned_abs() as u32
    } else {
        value as u32
    };

    let mut divisor: u32 = 1;
    while magnitude / divisor > 9 {
        divisor *= 10;
    }
    let mut remaining = magnitude;
    while divisor > 0 {
        emit(b'0' + (remaining / divisor) as u8);
        remaining %= divisor;
        divisor /= 10;
    }
}

fn put_hex(value: u32, emit: &mut impl FnMut(u8)) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    for i in (0..8).rev() {
        let nibble = (value >> (i * 4)) & 0xf;
        emit(DIGITS[nibble as usize]);
    }
}

/// Walks `fmt`, consuming one entry of `args` per `%s`/`%d`/`%x` directive,
/// and calling `emit` for every output byte. Non-directive bytes pass
/// through unchanged; `%%` emits one `%`; a `%` at the very end of the
/// string emits `%` and stops. `kprintf` is a thin wrapper of this over
/// the real console; tests drive it over an in-memory sink instead.
fn format(fmt: &str, args: &[Arg], emit: &mut impl FnMut(u8)) {
    let mut args = args.iter();
    let mut chars = fmt.bytes();

    while let Some(b) = chars.next() {
        if b != b'%' {
            emit(b);
            continue;
        }

        match chars.next() {
            None => {
                emit(b'%');
                return;
            }
            Some(b'%') => emit(b'%'),
            Some(b's') => {
                if let Some(Arg::Str(s)) = args.next() {
                    put_str(s, emit);
                }
            }
            Some(b'd') => {
                if let Some(Arg::Signed(v)) = args.next() {
                    put_signed(*v, emit);
                }
            }
            Some(b'x') => {
                if let Some(Arg::Hex(v)) = args.next() {
                    put_hex(*v, emit);
                }
            }
            Some(other) => emit(other),
        }
    }
}

pub fn kprintf(fmt: &str, args: &[Arg]) {
    format(fmt, args, &mut |b| console_putchar(b));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(fmt: &str, args: &[Arg]) -> String {
        let mut out = Vec::new();
        format(fmt, args, &mut |b| out.push(b));
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("hello\n", &[]), "hello\n");
    }

    #[test]
    fn formats_string_decimal_and_hex() {
        assert_eq!(
            render("%s=%d (0x%x)", &[Arg::Str("x"), Arg::Signed(42), Arg::Hex(42)]),
            "x=42 (0x0000002a)"
        );
    }

    #[test]
    fn percent_literal_is_escaped() {
        assert_eq!(render("100%%", &[]), "100%");
    }

    #[test]
    fn trailing_percent_is_emitted_and_stops() {
        assert_eq!(render("abc%", &[]), "abc%");
    }

    #[test]
    fn negative_values_print_a_minus_sign() {
        assert_eq!(render("%d", &[Arg::Signed(-7)]), "-7");
    }

    #[test]
    fn int_min_does_not_overflow() {
        assert_eq!(render("%d", &[Arg::Signed(i32::MIN)]), "-2147483648");
    }

    #[test]
    fn zero_formats_as_single_digit() {
        assert_eq!(render("%d", &[Arg::Signed(0)]), "0");
        assert_eq!(render("%x", &[Arg::Hex(0)]), "00000000");
    }
}

#[macro_export]
macro_rules! kprintf {
    ($fmt:expr) => {
        $crate::console::kprintf($fmt, &[])
    };
    ($fmt:expr, $($arg:expr),+ $(,)?) => {
        $crate::console::kprintf($fmt, &[$($crate::console::IntoArg::into_arg($arg)),+])
    };
}

/// Prints `"PANIC: <file>:<line>: <formatted>\n"` and halts the hart.
#[macro_export]
macro_rules! PANIC {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {{
        $crate::console::kprintf(
            "PANIC: %s:%d: ",
            &[
                $crate::console::Arg::Str(file!()),
                $crate::console::Arg::Signed(line!() as i32),
            ],
        );
        $crate::kprintf!(concat!($fmt, "\n") $(, $arg)*);
        $crate::halt()
    }};
}
