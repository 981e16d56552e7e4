//! The call adapter: typed handles in, an unresolved address out.
//!
//! Each [`CallArg`] flattens to one or two `i32` parameters. The adapter
//! checks the flattened count and the all-`i32` shape against the export's
//! declared signature before any guest code runs, invokes it, classifies
//! any failure, and watches for guest-initiated memory growth. Signature
//! errors leave the instance usable; only a failure inside the call
//! poisons it. The guest's return value comes back as an
//! [`UnresolvedResult`] and cannot be read until the caller supplies a
//! length for it.

use smallvec::SmallVec;
use wasmtime::{Val, ValType};

use ferry_arena::{TypedHandle, UnresolvedResult};
use ferry_core::{GuestAddress, GuestError};

use crate::instance::GuestInstance;

/// One logical argument to a guest export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallArg {
    /// An input buffer: expands to `(offset, length)`.
    Buffer(TypedHandle),
    /// An output slot the guest writes through: expands to `offset`.
    Output(TypedHandle),
    /// A raw guest address, e.g. a result being handed back to `free`.
    Address(GuestAddress),
    /// A plain integer.
    I32(i32),
}

impl CallArg {
    /// Number of `i32` parameters this argument occupies.
    pub fn arity(&self) -> usize {
        match self {
            Self::Buffer(_) => 2,
            Self::Output(_) | Self::Address(_) | Self::I32(_) => 1,
        }
    }

    // Offsets and lengths are u32 bit patterns reinterpreted as i32.
    fn push_params(&self, out: &mut SmallVec<[Val; 8]>) {
        match *self {
            Self::Buffer(handle) => {
                out.push(Val::I32(handle.offset() as i32));
                out.push(Val::I32(handle.len() as i32));
            }
            Self::Output(handle) => out.push(Val::I32(handle.offset() as i32)),
            Self::Address(address) => out.push(Val::I32(address.0 as i32)),
            Self::I32(value) => out.push(Val::I32(value)),
        }
    }
}

impl GuestInstance {
    /// Call `export`, expecting a single `i32` result interpreted as a
    /// guest address.
    ///
    /// A null return is passed through; callers that treat it as an error
    /// check [`UnresolvedResult::is_null`].
    pub fn invoke(
        &mut self,
        export: &str,
        args: &[CallArg],
    ) -> Result<UnresolvedResult, GuestError> {
        let results = self.call(export, args, 1)?;
        let raw = results
            .first()
            .and_then(Val::i32)
            .ok_or_else(|| GuestError::ResultMismatch {
                export: export.to_string(),
                expected: 1,
                actual: 0,
            })?;
        let address = GuestAddress(raw as u32);
        tracing::debug!(export, args = args.len(), %address, "guest call returned");
        Ok(UnresolvedResult::new(address))
    }

    /// Call `export`, expecting no results.
    pub fn invoke_void(&mut self, export: &str, args: &[CallArg]) -> Result<(), GuestError> {
        self.call(export, args, 0)?;
        tracing::debug!(export, args = args.len(), "guest call returned");
        Ok(())
    }

    fn call(
        &mut self,
        export: &str,
        args: &[CallArg],
        expected_results: usize,
    ) -> Result<SmallVec<[Val; 1]>, GuestError> {
        self.ensure_usable()?;
        let func = self.func(export)?;
        let ty = func.ty(&self.store);

        let mut params: SmallVec<[Val; 8]> = SmallVec::new();
        for arg in args {
            arg.push_params(&mut params);
        }
        let expected = ty.params().len();
        if params.len() != expected {
            return Err(GuestError::SignatureMismatch {
                export: export.to_string(),
                expected,
                actual: params.len(),
            });
        }
        let declared_results = ty.results().len();
        if declared_results != expected_results {
            return Err(GuestError::ResultMismatch {
                export: export.to_string(),
                expected: expected_results,
                actual: declared_results,
            });
        }

        let params_ty = ty.params().map(|t| ("parameter", t));
        let results_ty = ty.results().map(|t| ("result", t));
        let mismatch = params_ty
            .enumerate()
            .chain(results_ty.enumerate())
            .find(|(_, (_, t))| !matches!(t, ValType::I32));
        if let Some((index, (position, found))) = mismatch {
            return Err(GuestError::TypeMismatch {
                export: export.to_string(),
                position,
                index,
                found: found.to_string(),
            });
        }

        let mut results: SmallVec<[Val; 1]> = SmallVec::from_elem(Val::I32(0), declared_results);
        let before = self.memory_size();
        let outcome = func.call(&mut self.store, &params, &mut results);
        self.observe_growth(export, before);

        match outcome {
            Ok(()) => Ok(results),
            Err(error) => Err(self.poison(export, &error)),
        }
    }

    /// Mark the instance unusable after a fault in `export`.
    fn poison(&mut self, export: &str, error: &anyhow::Error) -> GuestError {
        let trap = error.downcast_ref::<wasmtime::Trap>().copied();
        let reason = format!("{error:#}");
        tracing::warn!(export, ?trap, %reason, "guest faulted; instance poisoned");
        self.poisoned = Some(export.to_string());
        GuestError::GuestTrap {
            export: export.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuestConfig;
    use ferry_arena::{Arena, ArenaConfig, PixelDimensions};
    use ferry_core::{GuestMemory, MemoryGeneration};
    use ferry_test_utils::{encode_rgba, wat};

    fn instance(source: &str) -> GuestInstance {
        GuestInstance::new(source.as_bytes(), GuestConfig::default()).unwrap()
    }

    /// Stage `input` and two output slots; returns (buffer, width, height).
    fn stage(guest: &mut GuestInstance, input: &[u8]) -> (TypedHandle, TypedHandle, TypedHandle) {
        let mut arena = Arena::new(ArenaConfig::tail()).unwrap();
        let buffer = arena.declare_buffer(input.len() as u32).unwrap();
        let width = arena.declare::<u32>().unwrap();
        let height = arena.declare::<u32>().unwrap();
        let mut memory = guest.memory().unwrap();
        let layout = arena.commit(&mut memory).unwrap();
        let handles = (
            layout.handle(&buffer).unwrap(),
            layout.handle(&width).unwrap(),
            layout.handle(&height).unwrap(),
        );
        handles.0.write_bytes(&mut memory, input).unwrap();
        handles
    }

    fn decode_args(handles: (TypedHandle, TypedHandle, TypedHandle)) -> [CallArg; 3] {
        [
            CallArg::Buffer(handles.0),
            CallArg::Output(handles.1),
            CallArg::Output(handles.2),
        ]
    }

    #[test]
    fn arity_counts_flattened_params() {
        assert_eq!(CallArg::I32(1).arity(), 1);
        assert_eq!(CallArg::Address(GuestAddress(4)).arity(), 1);
    }

    #[test]
    fn decode_round_trip_through_guest() {
        let mut guest = instance(wat::DECODER);
        let pixels: Vec<u8> = (0..24).collect();
        let handles = stage(&mut guest, &encode_rgba(2, 3, &pixels));

        let result = guest.invoke("decode", &decode_args(handles)).unwrap();
        assert!(!result.is_null());

        let memory = guest.memory().unwrap();
        let dims = PixelDimensions::rgba(
            handles.1.get::<u32, _>(&memory, 0).unwrap(),
            handles.2.get::<u32, _>(&memory, 0).unwrap(),
        );
        assert_eq!(dims, PixelDimensions::rgba(2, 3));
        let view = result.resolve_image(dims, &memory).unwrap();
        assert_eq!(view.len(), 24);
        assert_eq!(view.bytes(&memory).unwrap(), &pixels[..]);

        guest
            .invoke_void("free", &[CallArg::Address(result.address())])
            .unwrap();
    }

    #[test]
    fn guest_growth_bumps_generation() {
        let mut guest = instance(wat::DECODER);
        let handles = stage(&mut guest, &encode_rgba(1, 1, &[1, 2, 3, 4]));
        let staged = guest.memory_generation();
        guest.invoke("decode", &decode_args(handles)).unwrap();
        assert_eq!(guest.memory_generation(), staged.next());
    }

    #[test]
    fn invalid_input_yields_null() {
        let mut guest = instance(wat::DECODER);
        let handles = stage(&mut guest, &[1, 2, 3]);
        let result = guest.invoke("decode", &decode_args(handles)).unwrap();
        assert!(result.is_null());
    }

    #[test]
    fn wrong_arity_rejected_before_call() {
        let mut guest = instance(wat::DECODER);
        let result = guest.invoke("decode", &[CallArg::I32(0)]);
        assert_eq!(
            result,
            Err(GuestError::SignatureMismatch {
                export: "decode".into(),
                expected: 4,
                actual: 1,
            })
        );
        assert!(!guest.is_poisoned());
    }

    #[test]
    fn result_count_checked() {
        let mut guest = instance(wat::DECODER);
        let result = guest.invoke("free", &[CallArg::I32(0)]);
        assert!(matches!(result, Err(GuestError::ResultMismatch { .. })));
    }

    #[test]
    fn non_i32_signature_rejected_without_poisoning() {
        let mut guest = instance(wat::WIDE_SIGNATURES);
        assert_eq!(
            guest.invoke("wide_param", &[CallArg::I32(1)]),
            Err(GuestError::TypeMismatch {
                export: "wide_param".into(),
                position: "parameter",
                index: 0,
                found: "i64".into(),
            })
        );
        assert!(matches!(
            guest.invoke("float_result", &[CallArg::I32(1)]),
            Err(GuestError::TypeMismatch {
                position: "result",
                index: 0,
                ..
            })
        ));
        assert!(!guest.is_poisoned());
        assert!(guest.memory().is_ok());
        let value = guest.invoke("echo", &[CallArg::I32(7)]).unwrap();
        assert_eq!(value.address(), GuestAddress(7));
    }

    #[test]
    fn missing_export_reported() {
        let mut guest = instance(wat::MEMORY_ONLY);
        assert_eq!(
            guest.invoke_void("free", &[CallArg::I32(0)]),
            Err(GuestError::MissingExport {
                name: "free".into()
            })
        );
    }

    #[test]
    fn trap_poisons_instance() {
        let mut guest = instance(wat::TRAPPING);
        let handles = stage(&mut guest, &encode_rgba(1, 1, &[0; 4]));

        let first = guest.invoke("decode", &decode_args(handles));
        assert!(
            matches!(first, Err(GuestError::GuestTrap { ref export, .. }) if export == "decode")
        );
        assert!(guest.is_poisoned());

        assert_eq!(
            guest.invoke_void("free", &[CallArg::I32(0)]),
            Err(GuestError::Poisoned {
                export: "decode".into()
            })
        );
        assert!(matches!(guest.memory(), Err(GuestError::Poisoned { .. })));
    }

    #[test]
    fn free_releases_live_allocation() {
        let mut guest = instance(wat::DECODER);
        let handles = stage(&mut guest, &encode_rgba(1, 1, &[9; 4]));
        let result = guest.invoke("decode", &decode_args(handles)).unwrap();
        assert_eq!(live(&mut guest), 1);
        guest
            .invoke_void("free", &[CallArg::Address(result.address())])
            .unwrap();
        assert_eq!(live(&mut guest), 0);
    }

    fn live(guest: &mut GuestInstance) -> i32 {
        let live = guest.invoke("live_allocations", &[]).unwrap();
        live.address().0 as i32
    }

    #[test]
    fn host_growth_after_call_stales_result_view() {
        let mut guest = instance(wat::DECODER);
        let handles = stage(&mut guest, &encode_rgba(1, 1, &[1, 1, 1, 1]));
        let result = guest.invoke("decode", &decode_args(handles)).unwrap();
        let mut memory = guest.memory().unwrap();
        let view = result.resolve(4, &memory).unwrap();
        let capacity = memory.capacity();
        memory.grow_to(capacity + 1).unwrap();
        assert!(matches!(
            view.bytes(&memory),
            Err(ferry_core::ArenaError::StaleView { .. })
        ));
        assert_ne!(memory.generation(), MemoryGeneration(0));
    }
}
