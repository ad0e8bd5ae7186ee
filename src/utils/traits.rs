use crate::utils::error::{ImergeError, ImergeResult};

pub(crate) trait SafeAccess<T> {
    fn get_safe(&self, index: usize) -> ImergeResult<&T>;
    fn get_range_safe(&self, range: std::ops::Range<usize>) -> ImergeResult<&[T]>;
}

impl<T> SafeAccess<T> for [T] {
    /// Safely retrieves a reference to an element at the specified index in a slice.
    ///
    /// # Errors
    ///
    /// Returns `ImergeError::DecodeError` if the index is out of bounds.
    fn get_safe(&self, index: usize) -> ImergeResult<&T> {
        self.get(index).ok_or_else(|| {
            ImergeError::DecodeError(format!("Index {} out of bounds (len {})", index, self.len()))
        })
    }

    /// Safely retrieves a reference to a range of elements in a slice.
    ///
    /// # Arguments
    ///
    /// * `range` - The range of elements to retrieve.
    ///
    /// # Returns
    ///
    /// * `Ok(&[T])` - A reference to the range of elements if it exists.
    /// * `Err(ImergeError)` - An error if the range is out of bounds.
    ///
    /// # Errors
    ///
    /// Returns `ImergeError::DecodeError` if the range is out of bounds
    /// or if the range start is greater than the range end.
    fn get_range_safe(&self, range: std::ops::Range<usize>) -> ImergeResult<&[T]> {
        self.get(range.clone()).ok_or_else(|| {
            ImergeError::DecodeError(format!(
                "Range {}..{} out of bounds (len {})",
                range.start,
                range.end,
                self.len()
            ))
        })
    }
}
