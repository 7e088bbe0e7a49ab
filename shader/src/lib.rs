#![cfg_attr(target_arch = "spirv", no_std)]
#![deny(warnings)]

use shared::{Params, WORKGROUP_SIZE};
use spirv_std::macros::spirv;

use spirv_std::glam::*;

// `threads` only takes literals; the host sizes its dispatch with
// `WORKGROUP_SIZE`, so the two must stay equal.
const _: () = assert!(WORKGROUP_SIZE == 8);

/// One invocation per pixel in `shared::WORKGROUP_SIZE` square workgroups.
#[spirv(compute(threads(8, 8)))]
pub fn main_cs(
    #[spirv(global_invocation_id)] id: UVec3,
    #[spirv(push_constant)] params: &Params,
    #[spirv(storage_buffer, descriptor_set = 0, binding = 0)] counts: &mut [u32],
) {
    if id.x >= params.width || id.y >= params.height {
        return;
    }

    let index = (id.y * params.width + id.x) as usize;
    counts[index] = params.escape_time_at(id.x, id.y);
}

#[spirv(vertex)]
pub fn main_vs(position: Vec2, #[spirv(position, invariant)] out: &mut Vec4) {
    *out = vec4(position.x, position.y, 0.0, 1.0);
}

/// Colors the counts produced by `main_cs`.
#[spirv(fragment)]
pub fn main_fs(
    #[spirv(frag_coord)] position: Vec4,
    #[spirv(push_constant)] params: &Params,
    #[spirv(storage_buffer, descriptor_set = 0, binding = 0)] counts: &[u32],
    output: &mut Vec4,
) {
    let x = (position.x as u32).min(params.width - 1);
    let y = (position.y as u32).min(params.height - 1);
    let count = counts[(y * params.width + x) as usize];

    *output = params.shade(count);
}
