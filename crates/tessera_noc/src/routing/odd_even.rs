//! Odd-even turn-model routing (Chiu, 2000).

use crate::error::NocError;
use crate::ids::{NocLinkId, NocRouterId, TrafficFlowId};
use crate::routing::{route_with_turn_model, Direction, RoutingAlgorithm, TurnModel};
use crate::storage::NocStorage;

/// Odd-even routing: east-north and east-south turns are forbidden in even
/// columns, north-west and south-west turns in odd ones. Column parity is
/// taken in the compressed coordinate space (distinct router columns,
/// densely renumbered), so sparse NoC grids behave like their logical mesh.
#[derive(Debug, Default)]
pub struct OddEvenRouting;

fn is_odd(v: usize) -> bool {
    v % 2 == 1
}

impl TurnModel for OddEvenRouting {
    fn legal_directions(
        &self,
        src: NocRouterId,
        curr: NocRouterId,
        dst: NocRouterId,
        noc: &NocStorage,
    ) -> Vec<Direction> {
        let (src_x, _) = noc.compressed_loc(src);
        let (curr_x, curr_y) = noc.compressed_loc(curr);
        let (dst_x, dst_y) = noc.compressed_loc(dst);
        let diff_x = dst_x as i64 - curr_x as i64;
        let diff_y = dst_y as i64 - curr_y as i64;
        let mut legal = Vec::with_capacity(2);

        if diff_x == 0 {
            // Column-aligned: only vertical moves remain.
            if diff_y > 0 {
                legal.push(Direction::North);
            } else if diff_y < 0 {
                legal.push(Direction::South);
            }
        } else if diff_x > 0 {
            // Eastbound message.
            if diff_y == 0 {
                legal.push(Direction::East);
            } else {
                // EN and ES turns are forbidden in even columns, so the
                // vertical leg may only be taken in odd columns (or before
                // the first east hop).
                if is_odd(curr_x) || curr_x == src_x {
                    if diff_y > 0 {
                        legal.push(Direction::North);
                    } else {
                        legal.push(Direction::South);
                    }
                }
                // Keep east available unless the last column before an even
                // destination would strand the vertical leg.
                if is_odd(dst_x) || diff_x != 1 {
                    legal.push(Direction::East);
                }
            }
        } else {
            // Westbound message: NW and SW turns are forbidden in odd
            // columns, so verticals are allowed only in even ones.
            legal.push(Direction::West);
            if !is_odd(curr_x) {
                if diff_y > 0 {
                    legal.push(Direction::North);
                } else if diff_y < 0 {
                    legal.push(Direction::South);
                }
            }
        }
        legal
    }
}

impl RoutingAlgorithm for OddEvenRouting {
    fn route_flow(
        &mut self,
        src: NocRouterId,
        dst: NocRouterId,
        flow: TrafficFlowId,
        route: &mut Vec<NocLinkId>,
        noc: &NocStorage,
    ) -> Result<(), NocError> {
        route_with_turn_model(self, src, dst, flow, route, noc)
    }
}
