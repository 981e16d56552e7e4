//! Guest module fixtures in WebAssembly text format.
//!
//! All decoders share one contract:
//!
//! - `decode(in_ptr, in_len, w_out, h_out) -> ptr` reads a raw image in
//!   the [`encode_rgba`](crate::encode_rgba) format, writes its width and
//!   height through the two out pointers and returns a pointer to a copy
//!   of the pixels. It returns 0 for malformed input.
//! - `free(ptr)` releases a pointer returned by `decode`.
//!
//! The decoder obtains output memory with `memory.grow` only, so every
//! decode grows the memory and never touches bytes the host reserved
//! at the old tail.

macro_rules! decoder_exports {
    () => {
        r#"
  (memory (export "memory") 1)
  (global $live (mut i32) (i32.const 0))

  (func (export "decode")
        (param $in i32) (param $len i32) (param $w_out i32) (param $h_out i32)
        (result i32)
    (local $w i32) (local $h i32) (local $size i64) (local $old i32) (local $ptr i32)
    (if (i32.lt_u (local.get $len) (i32.const 8))
      (then (return (i32.const 0))))
    (local.set $w (i32.load (local.get $in)))
    (local.set $h (i32.load offset=4 (local.get $in)))
    (local.set $size
      (i64.mul
        (i64.mul (i64.extend_i32_u (local.get $w)) (i64.extend_i32_u (local.get $h)))
        (i64.const 4)))
    (if (i64.eqz (local.get $size))
      (then (return (i32.const 0))))
    (if (i64.ne (local.get $size)
                (i64.extend_i32_u (i32.sub (local.get $len) (i32.const 8))))
      (then (return (i32.const 0))))
    (local.set $old
      (memory.grow
        (i32.wrap_i64
          (i64.shr_u (i64.add (local.get $size) (i64.const 65535)) (i64.const 16)))))
    (if (i32.eq (local.get $old) (i32.const -1))
      (then (return (i32.const 0))))
    (local.set $ptr (i32.shl (local.get $old) (i32.const 16)))
    (memory.copy
      (local.get $ptr)
      (i32.add (local.get $in) (i32.const 8))
      (i32.wrap_i64 (local.get $size)))
    (i32.store (local.get $w_out) (local.get $w))
    (i32.store (local.get $h_out) (local.get $h))
    (global.set $live (i32.add (global.get $live) (i32.const 1)))
    (local.get $ptr))

  (func (export "live_allocations") (result i32)
    (global.get $live))
"#
    };
}

/// Working decoder with `decode`, `free` and `live_allocations` exports.
///
/// `live_allocations` counts decodes not yet freed.
pub const DECODER: &str = concat!(
    "(module",
    decoder_exports!(),
    r#"
  (func (export "free") (param $ptr i32)
    (if (i32.ne (local.get $ptr) (i32.const 0))
      (then (global.set $live (i32.sub (global.get $live) (i32.const 1))))))
)"#
);

/// The working decoder without a `free` export.
pub const DECODER_WITHOUT_FREE: &str = concat!("(module", decoder_exports!(), ")");

/// A decoder that allocates one page but reports 4096x4096 dimensions,
/// far more than it wrote. Exports `free` and `live_allocations`.
pub const OVERSTATING: &str = r#"(module
  (memory (export "memory") 1)
  (global $live (mut i32) (i32.const 0))
  (func (export "decode")
        (param $in i32) (param $len i32) (param $w_out i32) (param $h_out i32)
        (result i32)
    (local $old i32)
    (local.set $old (memory.grow (i32.const 1)))
    (i32.store (local.get $w_out) (i32.const 4096))
    (i32.store (local.get $h_out) (i32.const 4096))
    (global.set $live (i32.add (global.get $live) (i32.const 1)))
    (i32.shl (local.get $old) (i32.const 16)))
  (func (export "free") (param $ptr i32)
    (global.set $live (i32.sub (global.get $live) (i32.const 1))))
  (func (export "live_allocations") (result i32)
    (global.get $live))
)"#;

/// Exports with non-`i32` signatures next to a well-formed `echo`.
pub const WIDE_SIGNATURES: &str = r#"(module
  (memory (export "memory") 1)
  (func (export "wide_param") (param i64) (result i32)
    i32.const 0)
  (func (export "float_result") (param i32) (result f32)
    f32.const 0)
  (func (export "echo") (param i32) (result i32)
    local.get 0)
)"#;

/// A decoder whose `decode` always traps.
pub const TRAPPING: &str = r#"(module
  (memory (export "memory") 1)
  (func (export "decode") (param i32 i32 i32 i32) (result i32)
    unreachable)
  (func (export "free") (param i32))
)"#;

/// A module exporting a memory and nothing else.
pub const MEMORY_ONLY: &str = r#"(module
  (memory (export "memory") 1)
)"#;

/// A module exporting functions but no memory.
pub const NO_MEMORY: &str = r#"(module
  (func (export "decode") (param i32 i32 i32 i32) (result i32)
    i32.const 0)
)"#;

/// A module that cannot be instantiated without host imports.
pub const NEEDS_IMPORT: &str = r#"(module
  (import "env" "log" (func (param i32)))
  (memory (export "memory") 1)
)"#;
