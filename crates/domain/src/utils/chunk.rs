use crate::{PanelPostError, Result};

/// Split `items` into consecutive groups of at most `size` elements.
///
/// # Errors
///
/// Returns [`PanelPostError::InvalidInput`] when `size` is zero.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Result<Vec<Vec<T>>> {
    if size == 0 {
        return Err(PanelPostError::InvalidInput("chunk size must be greater than zero".into()));
    }
    Ok(items.chunks(size).map(<[T]>::to_vec).collect())
}
