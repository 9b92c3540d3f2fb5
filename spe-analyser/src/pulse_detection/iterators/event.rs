use super::super::{Detector, Real};

#[derive(Clone)]
pub(crate) struct EventIter<I, D>
where
    I: Iterator<Item = (usize, Real)>,
    D: Detector,
{
    source: I,
    detector: D,
    finished: bool,
}

impl<I, D> Iterator for EventIter<I, D>
where
    I: Iterator<Item = (usize, Real)>,
    D: Detector,
{
    type Item = D::EventPointType;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, value) in self.source.by_ref() {
            if let Some(event) = self.detector.signal(index, value) {
                return Some(event);
            }
        }
        if self.finished {
            None
        } else {
            self.finished = true;
            self.detector.finish()
        }
    }
}

pub(crate) trait EventFilter<I, D>
where
    I: Iterator<Item = (usize, Real)>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D>;
}

impl<I, D> EventFilter<I, D> for I
where
    I: Iterator<Item = (usize, Real)>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D> {
        EventIter {
            source: self,
            detector,
            finished: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits the index of every sample above zero, and a final event on finish.
    #[derive(Clone, Default)]
    struct Positive {
        finishes: usize,
    }

    impl Detector for Positive {
        type EventPointType = usize;

        fn signal(&mut self, index: usize, value: Real) -> Option<usize> {
            (value > 0.0).then_some(index)
        }

        fn finish(&mut self) -> Option<usize> {
            self.finishes += 1;
            Some(usize::MAX)
        }
    }

    #[test]
    fn finish_is_called_once() {
        let data = [1.0, -1.0, 2.0];
        let mut iter = data.into_iter().enumerate().events(Positive::default());
        assert_eq!(iter.next(), Some(0));
        assert_eq!(iter.next(), Some(2));
        assert_eq!(iter.next(), Some(usize::MAX));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.detector.finishes, 1);
    }
}
