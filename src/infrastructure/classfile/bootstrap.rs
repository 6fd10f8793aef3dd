//! `BootstrapMethods` attribute and lambda call-site resolution.

use super::bytecode::InvokeKind;
use super::constant_pool::{ConstantPool, MemberRef};
use super::parser::{Parser, Result};
use crate::error::malformed_error;

pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";
pub const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";
/// Position of the implementation handle among the metafactory's static arguments.
const IMPLEMENTATION_ARGUMENT: usize = 1;

/// One entry of the `BootstrapMethods` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    pub method_ref: u16,
    pub arguments: Vec<u16>,
}

/// The class-level bootstrap table indexed by `invokedynamic` call sites.
#[derive(Debug, Clone, Default)]
pub struct BootstrapMethods {
    entries: Vec<BootstrapMethod>,
}

impl BootstrapMethods {
    pub fn parse(parser: &mut Parser<'_>) -> Result<Self> {
        let count = parser.read_u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let method_ref = parser.read_u16()?;
            let argument_count = parser.read_u16()?;
            let mut arguments = Vec::with_capacity(argument_count as usize);
            for _ in 0..argument_count {
                arguments.push(parser.read_u16()?);
            }
            entries.push(BootstrapMethod {
                method_ref,
                arguments,
            });
        }
        Ok(Self { entries })
    }

    /// The method a lambda or method reference created at `call_site` delegates to.
    ///
    /// `call_site` is the `InvokeDynamic` constant of an `invokedynamic`. Call sites
    /// bootstrapped by anything other than `LambdaMetafactory` (string concatenation,
    /// record methods, pattern switches) yield `None`.
    pub fn lambda_target<'p>(
        &self,
        pool: &'p ConstantPool,
        call_site: u16,
    ) -> Result<Option<(InvokeKind, MemberRef<'p>)>> {
        let slot = pool.invoke_dynamic(call_site)?;
        let bootstrap = self.entries.get(slot as usize).ok_or_else(|| {
            malformed_error!(
                "call site {} names bootstrap method {} of {}",
                call_site,
                slot,
                self.entries.len()
            )
        })?;

        let (_, factory_index) = pool.method_handle(bootstrap.method_ref)?;
        let factory = pool.method_ref(factory_index)?;
        if factory.owner != LAMBDA_METAFACTORY {
            return Ok(None);
        }

        let Some(&handle) = bootstrap.arguments.get(IMPLEMENTATION_ARGUMENT) else {
            return Ok(None);
        };
        let (reference_kind, target) = pool.method_handle(handle)?;
        let Some(kind) = InvokeKind::from_reference_kind(reference_kind) else {
            return Ok(None);
        };
        Ok(Some((kind, pool.method_ref(target)?)))
    }
}
