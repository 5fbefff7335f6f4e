//! Implement [`std::fmt::Display`] for composite types used in log output.

use std::fmt;

/// Implement `Display` for `&[T]` if T is `Display`.
///
/// It outputs at most 5 elements, eliding those from the 5th to the
/// second-to-last one: `DisplaySlice(&[1,2,3,4,5,6])` outputs `"[1,2,3,4,..,6]"`.
pub(crate) struct DisplaySlice<'a, T: fmt::Display>(pub &'a [T]);

impl<'a, T: fmt::Display> fmt::Display for DisplaySlice<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slice = self.0;
        let max = 5;
        let len = slice.len();

        write!(f, "[")?;

        if len > max {
            for (i, t) in slice[..(max - 1)].iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }

                write!(f, "{}", t)?;
            }

            write!(f, ",..,")?;
            write!(f, "{}", slice.last().unwrap())?;
        } else {
            for (i, t) in slice.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }

                write!(f, "{}", t)?;
            }
        }

        write!(f, "]")
    }
}
