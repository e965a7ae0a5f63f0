//! Power-of-two rounding helpers.
//!
//! Used to snap mapping offsets to the platform allocation granularity.

/// Unsigned integers that can be rounded to a power-of-two boundary.
pub trait Alignable: Copy {
    fn align_up(self, align: Self) -> Self;
    fn align_down(self, align: Self) -> Self;
    fn is_aligned(self, align: Self) -> bool;
}

macro_rules! impl_alignable {
    ($($t:ty),*) => {
        $(
            impl Alignable for $t {
                #[inline]
                fn align_up(self, align: Self) -> Self {
                    debug_assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
                    let mask = align - 1;
                    (self + mask) & !mask
                }

                #[inline]
                fn align_down(self, align: Self) -> Self {
                    debug_assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
                    self & !(align - 1)
                }

                #[inline]
                fn is_aligned(self, align: Self) -> bool {
                    debug_assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
                    self & (align - 1) == 0
                }
            }
        )*
    };
}

impl_alignable!(u8, u16, u32, u64, usize);

/// Rounds `value` up to the next multiple of `align`.
///
/// `align` must be a power of two. Overflows if the rounded value does not
/// fit into `T`.
#[inline]
pub fn align_up<T: Alignable>(value: T, align: T) -> T {
    value.align_up(align)
}

/// Rounds `value` down to the previous multiple of `align`.
#[inline]
pub fn align_down<T: Alignable>(value: T, align: T) -> T {
    value.align_down(align)
}

/// Whether `value` is a multiple of `align`.
#[inline]
pub fn is_aligned<T: Alignable>(value: T, align: T) -> bool {
    value.is_aligned(align)
}
