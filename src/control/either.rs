//! Either type - a value that can be one of two types.
//!
//! `Either<L, R>` represents a value that is either a `Left(L)` or a
//! `Right(R)`. In this crate it is the settlement value of an effect:
//! `Left` carries the typed error, `Right` carries the success value.
//!
//! # Examples
//!
//! ```rust
//! use dispatchio::control::Either;
//!
//! let success: Either<String, i32> = Either::Right(42);
//! assert!(success.is_right());
//!
//! let failure: Either<String, i32> = Either::Left("boom".to_string());
//! assert_eq!(failure.left(), Some("boom".to_string()));
//! ```

/// A value that can be one of two types.
///
/// By convention `Left` represents failure and `Right` represents success,
/// matching the orientation of the effect system's typed error channel.
///
/// # Type Parameters
///
/// * `L` - The type of the left value (conventionally the error)
/// * `R` - The type of the right value (conventionally the success)
///
/// # Examples
///
/// ```rust
/// use dispatchio::control::Either;
///
/// let doubled = Either::<String, i32>::Right(21).map_right(|x| x * 2);
/// assert_eq!(doubled, Either::Right(42));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Either<L, R> {
    /// The left variant, conventionally the failure alternative.
    Left(L),
    /// The right variant, conventionally the success alternative.
    Right(R),
}

impl<L, R> Either<L, R> {
    /// Returns `true` if this is a `Left` value.
    #[inline]
    pub const fn is_left(&self) -> bool {
        matches!(self, Self::Left(_))
    }

    /// Returns `true` if this is a `Right` value.
    #[inline]
    pub const fn is_right(&self) -> bool {
        matches!(self, Self::Right(_))
    }

    /// Converts the `Either` into an `Option<L>`, consuming the either.
    ///
    /// Returns `Some(l)` if this is `Left(l)`, otherwise `None`.
    #[inline]
    pub fn left(self) -> Option<L> {
        match self {
            Self::Left(value) => Some(value),
            Self::Right(_) => None,
        }
    }

    /// Converts the `Either` into an `Option<R>`, consuming the either.
    ///
    /// Returns `Some(r)` if this is `Right(r)`, otherwise `None`.
    #[inline]
    pub fn right(self) -> Option<R> {
        match self {
            Self::Left(_) => None,
            Self::Right(value) => Some(value),
        }
    }

    /// Collapses the `Either` into a single value by applying the matching
    /// function to whichever side is present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dispatchio::control::Either;
    ///
    /// let value: Either<String, i32> = Either::Right(2);
    /// assert_eq!(value.fold(|e| e.len() as i32, |v| v * 10), 20);
    /// ```
    #[inline]
    pub fn fold<T, FL, FR>(self, on_left: FL, on_right: FR) -> T
    where
        FL: FnOnce(L) -> T,
        FR: FnOnce(R) -> T,
    {
        match self {
            Self::Left(value) => on_left(value),
            Self::Right(value) => on_right(value),
        }
    }

    /// Transforms the left value, leaving a right value untouched.
    #[inline]
    pub fn map_left<T, F>(self, function: F) -> Either<T, R>
    where
        F: FnOnce(L) -> T,
    {
        match self {
            Self::Left(value) => Either::Left(function(value)),
            Self::Right(value) => Either::Right(value),
        }
    }

    /// Transforms the right value, leaving a left value untouched.
    #[inline]
    pub fn map_right<T, F>(self, function: F) -> Either<L, T>
    where
        F: FnOnce(R) -> T,
    {
        match self {
            Self::Left(value) => Either::Left(value),
            Self::Right(value) => Either::Right(function(value)),
        }
    }

    /// Converts into a `Result`, mapping `Right` to `Ok` and `Left` to `Err`.
    #[inline]
    pub fn into_result(self) -> Result<R, L> {
        match self {
            Self::Left(value) => Err(value),
            Self::Right(value) => Ok(value),
        }
    }
}

impl<L, R> From<Result<R, L>> for Either<L, R> {
    #[inline]
    fn from(result: Result<R, L>) -> Self {
        match result {
            Ok(value) => Self::Right(value),
            Err(value) => Self::Left(value),
        }
    }
}

impl<L, R> From<Either<L, R>> for Result<R, L> {
    #[inline]
    fn from(either: Either<L, R>) -> Self {
        either.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_left_and_is_right() {
        let left: Either<i32, &str> = Either::Left(1);
        let right: Either<i32, &str> = Either::Right("ok");
        assert!(left.is_left());
        assert!(!left.is_right());
        assert!(right.is_right());
        assert!(!right.is_left());
    }

    #[test]
    fn test_left_and_right_extraction() {
        let left: Either<i32, &str> = Either::Left(1);
        assert_eq!(left.left(), Some(1));
        let right: Either<i32, &str> = Either::Right("ok");
        assert_eq!(right.right(), Some("ok"));
        let missing: Either<i32, &str> = Either::Right("ok");
        assert_eq!(missing.left(), None);
    }

    #[test]
    fn test_fold_selects_matching_side() {
        let left: Either<String, i32> = Either::Left("abc".to_string());
        assert_eq!(left.fold(|e| e.len(), |v| v as usize), 3);
        let right: Either<String, i32> = Either::Right(5);
        assert_eq!(right.fold(|e| e.len(), |v| v as usize), 5);
    }

    #[test]
    fn test_map_left_and_map_right() {
        let left: Either<i32, i32> = Either::Left(1);
        assert_eq!(left.map_left(|x| x + 1), Either::Left(2));
        assert_eq!(Either::<i32, i32>::Right(1).map_right(|x| x + 1), Either::Right(2));
        let untouched: Either<i32, i32> = Either::Right(7);
        assert_eq!(untouched.map_left(|x| x + 1), Either::Right(7));
    }

    #[test]
    fn test_result_round_trip() {
        let ok: Result<i32, String> = Ok(3);
        assert_eq!(Either::from(ok), Either::Right(3));
        let err: Result<i32, String> = Err("e".to_string());
        assert_eq!(Either::from(err), Either::Left("e".to_string()));
        assert_eq!(Either::<String, i32>::Right(3).into_result(), Ok(3));
    }
}
