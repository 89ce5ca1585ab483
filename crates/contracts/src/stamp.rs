//! Stamp - ordering key of every dispatch
//!
//! A stamp is totally ordered and subtractable. The difference between two
//! stamps is an offset (a duration-like value), also totally ordered.

use std::fmt;
use std::time::Duration;

/// Totally ordered, subtractable timestamp.
///
/// `offset_since`, `rewind` and `scale_offset` saturate instead of
/// overflowing, so a window shifted below the representable range clamps to
/// the minimum stamp. Unsigned stamps and `Duration` clamp at zero: policies
/// that must not confuse "before zero" with zero use [`Stamp::checked_rewind`].
///
/// # Examples
/// ```
/// use contracts::Stamp;
///
/// assert_eq!(10i64.offset_since(4), 6);
/// assert_eq!(10i64.rewind(15), -5);
/// assert_eq!(i64::scale_offset(3, 2), 6);
/// assert_eq!(5u64.checked_rewind(10), None);
/// ```
pub trait Stamp: Copy + Ord + Default + fmt::Debug + Send + Sync + 'static {
    /// Difference between two stamps.
    type Offset: Copy + Ord + Default + fmt::Debug + Send + Sync + 'static;

    /// The zero offset.
    const ZERO_OFFSET: Self::Offset;

    /// `self - earlier`
    fn offset_since(self, earlier: Self) -> Self::Offset;

    /// `self - offset`
    fn rewind(self, offset: Self::Offset) -> Self;

    /// `self - offset`, `None` when the result is not representable
    fn checked_rewind(self, offset: Self::Offset) -> Option<Self>;

    /// `offset * factor`
    fn scale_offset(offset: Self::Offset, factor: u32) -> Self::Offset;
}

macro_rules! impl_integer_stamp {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Stamp for $ty {
                type Offset = $ty;

                const ZERO_OFFSET: $ty = 0;

                #[inline]
                fn offset_since(self, earlier: Self) -> Self::Offset {
                    self.saturating_sub(earlier)
                }

                #[inline]
                fn rewind(self, offset: Self::Offset) -> Self {
                    self.saturating_sub(offset)
                }

                #[inline]
                fn checked_rewind(self, offset: Self::Offset) -> Option<Self> {
                    self.checked_sub(offset)
                }

                #[inline]
                fn scale_offset(offset: Self::Offset, factor: u32) -> Self::Offset {
                    let factor = <$ty>::try_from(factor).unwrap_or(<$ty>::MAX);
                    offset.saturating_mul(factor)
                }
            }
        )*
    };
}

impl_integer_stamp!(i32, i64, u32, u64);

impl Stamp for Duration {
    type Offset = Duration;

    const ZERO_OFFSET: Duration = Duration::ZERO;

    #[inline]
    fn offset_since(self, earlier: Self) -> Self::Offset {
        self.saturating_sub(earlier)
    }

    #[inline]
    fn rewind(self, offset: Self::Offset) -> Self {
        self.saturating_sub(offset)
    }

    #[inline]
    fn checked_rewind(self, offset: Self::Offset) -> Option<Self> {
        self.checked_sub(offset)
    }

    #[inline]
    fn scale_offset(offset: Self::Offset, factor: u32) -> Self::Offset {
        offset.saturating_mul(factor)
    }
}
