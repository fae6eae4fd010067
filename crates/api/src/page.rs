use crate::error::{ApiError, ApiResult};

pub const DEFAULT_PAGE_SIZE: i32 = 25;
pub const MAX_PAGE_SIZE: i32 = 100;

/// Validated `first`/`offset` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageArgs {
    pub limit: u64,
    pub offset: u64,
}

impl Default for PageArgs {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE as u64,
            offset: 0,
        }
    }
}

impl PageArgs {
    pub fn new(first: Option<i32>, offset: Option<i32>) -> ApiResult<Self> {
        let requested = first.unwrap_or(DEFAULT_PAGE_SIZE);
        if requested <= 0 {
            return Err(ApiError::invalid("first", "first must be positive"));
        }
        if requested > MAX_PAGE_SIZE {
            return Err(ApiError::LimitExceeded(format!(
                "Cannot request more than {} rows at once",
                MAX_PAGE_SIZE
            )));
        }
        Ok(Self {
            limit: requested as u64,
            offset: offset.unwrap_or(0).max(0) as u64,
        })
    }

    /// Cuts one page out of an already filtered and sorted list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(PageArgs::new(None, None).unwrap(), PageArgs::default());
    }

    #[test]
    fn rejects_out_of_range_sizes() {
        assert_eq!(PageArgs::new(Some(0), None).unwrap_err().code(), "VALIDATION");
        assert_eq!(
            PageArgs::new(Some(101), None).unwrap_err().code(),
            "LIMIT_EXCEEDED"
        );
        assert_eq!(PageArgs::new(Some(100), Some(-4)).unwrap().offset, 0);
    }

    #[test]
    fn slices_in_memory_rows() {
        let page = PageArgs::new(Some(2), Some(3)).unwrap();
        assert_eq!(page.slice((1..=6).collect()), vec![4, 5]);
        assert!(page.slice(vec![1, 2]).is_empty());
    }
}
