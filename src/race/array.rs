use super::{Coordinator, EmptyRace, Race as RaceTrait, RaceUntil};
use crate::cancel::CancelToken;
use crate::operation::Operation;

impl<O, const N: usize> RaceTrait for [O; N]
where
    O: Operation,
{
    type Output = O::Output;
    type Error = O::Error;
    type Future = RaceUntil<O>;

    fn race_until(self, token: &CancelToken) -> Result<Self::Future, EmptyRace> {
        Coordinator::new().race(self, token)
    }
}
