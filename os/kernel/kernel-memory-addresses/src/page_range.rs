use crate::{PageSize, PhysicalAddress, PhysicalPage};
use core::iter::FusedIterator;

/// Iterator over every **whole** page of size `S` inside `[start, end)`.
///
/// The start is rounded up to a page boundary; a trailing partial page is
/// not yielded. Pages come out in ascending address order.
#[derive(Clone, Debug)]
pub struct PageRange<S: PageSize> {
    next: Option<PhysicalPage<S>>,
    end: PhysicalAddress,
}

impl<S: PageSize> PageRange<S> {
    #[must_use]
    pub const fn whole_pages(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        let next = match start.align_up::<S>() {
            Some(first) => Some(PhysicalPage::containing(first)),
            None => None,
        };
        Self { next, end }
    }

    /// Number of pages still to be yielded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn remaining(&self) -> usize {
        match self.next {
            Some(page) if page.base().as_u64() < self.end.as_u64() => {
                ((self.end.as_u64() - page.base().as_u64()) >> S::SHIFT) as usize
            }
            _ => 0,
        }
    }
}

impl<S: PageSize> Iterator for PageRange<S> {
    type Item = PhysicalPage<S>;

    fn next(&mut self) -> Option<Self::Item> {
        let page = self.next?;
        match page.base().checked_add(S::SIZE) {
            Some(page_end) if page_end <= self.end => {
                self.next = page.next();
                Some(page)
            }
            _ => {
                self.next = None;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl<S: PageSize> ExactSizeIterator for PageRange<S> {}
impl<S: PageSize> FusedIterator for PageRange<S> {}
