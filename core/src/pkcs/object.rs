use pkcs11::types::*;
use pkcs11::Ctx;

use crate::pkcs::attribute::{Attribute, AttributeType, Attributes};
use crate::pkcs::Result;

#[derive(Debug)]
pub(crate) struct Object<'a> {
    ctx: &'a Ctx,
    session: CK_SESSION_HANDLE,
    handle: CK_OBJECT_HANDLE,
}

impl<'a> Object<'a> {
    pub(crate) fn new(
        ctx: &'a Ctx,
        session: CK_SESSION_HANDLE,
        handle: CK_OBJECT_HANDLE,
    ) -> Self {
        Self {
            ctx,
            session,
            handle,
        }
    }

    /// Reads the attributes in two passes: lengths first, then values.
    pub(crate) fn get_attributes(&self, types: &[AttributeType]) -> Result<Attributes> {
        let session_handle = self.session;
        let mut template = types
            .iter()
            .map(|ty| CK_ATTRIBUTE::new((*ty).into()))
            .collect::<Vec<CK_ATTRIBUTE>>();

        self.ctx
            .get_attribute_value(session_handle, self.handle, &mut template)?;

        let mut buffers = template
            .iter()
            .map(|t| match t.ulValueLen == CK_UNAVAILABLE_INFORMATION {
                true => Vec::new(),
                _ => vec![0u8; t.ulValueLen as usize],
            })
            .collect::<Vec<Vec<u8>>>();

        template
            .iter_mut()
            .zip(buffers.iter_mut())
            .for_each(|(a, b)| {
                a.pValue = b.as_mut_ptr() as CK_VOID_PTR;
                a.ulValueLen = b.len() as CK_ULONG;
            });

        self.ctx
            .get_attribute_value(session_handle, self.handle, &mut template)?;

        template.iter().zip(buffers.iter_mut()).for_each(|(a, b)| {
            if a.ulValueLen != CK_UNAVAILABLE_INFORMATION {
                b.truncate(a.ulValueLen as usize);
            }
        });

        Ok((template, buffers).into())
    }

    /// Reads the label, if the token has one for the object.
    pub(crate) fn label(&self) -> Result<Option<String>> {
        Ok(
            match self.get_attributes(&[AttributeType::Label])?.take(AttributeType::Label) {
                Some(Attribute::Label(label)) => Some(label),
                _ => None,
            },
        )
    }

    /// Reads the value, i.e. the DER encoding of a certificate.
    pub(crate) fn value(&self) -> Result<Vec<u8>> {
        Ok(
            match self.get_attributes(&[AttributeType::Value])?.take(AttributeType::Value) {
                Some(Attribute::Value(value)) => value,
                _ => Vec::new(),
            },
        )
    }
}
