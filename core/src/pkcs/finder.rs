use pkcs11::types::{CK_ATTRIBUTE, CK_SESSION_HANDLE, CK_ULONG};
use pkcs11::Ctx;

use crate::pkcs::attribute::Attribute;
use crate::pkcs::object::Object;
use crate::pkcs::Result;

const BATCH_SIZE: CK_ULONG = 16;

#[derive(Debug)]
pub(crate) struct Finder<'a> {
    ctx: &'a Ctx,
    session: CK_SESSION_HANDLE,
}

impl<'a> Finder<'a> {
    pub(crate) fn new(ctx: &'a Ctx, session: CK_SESSION_HANDLE) -> Self {
        Self { ctx, session }
    }

    pub(crate) fn init(&self, attributes: &[Attribute]) -> Result<()> {
        self.ctx.find_objects_init(
            self.session,
            &attributes
                .iter()
                .map(CK_ATTRIBUTE::from)
                .collect::<Vec<CK_ATTRIBUTE>>(),
        )
    }

    pub(crate) fn find_objects(&self, max: CK_ULONG) -> Result<Vec<Object<'a>>> {
        Ok(self
            .ctx
            .find_objects(self.session, max)?
            .iter()
            .map(|handle| Object::new(self.ctx, self.session, *handle))
            .collect())
    }

    pub(crate) fn close(&self) -> Result<()> {
        self.ctx.find_objects_final(self.session)
    }

    /// Finds every object matching the attributes, in the order of the token.
    pub(crate) fn find_all(&self, attributes: &[Attribute]) -> Result<Vec<Object<'a>>> {
        self.init(attributes)?;

        let mut objects = Vec::new();
        let found = loop {
            match self.find_objects(BATCH_SIZE) {
                Ok(batch) if batch.is_empty() => break Ok(()),
                Ok(batch) => objects.extend(batch),
                Err(e) => break Err(e),
            }
        };

        // The search must be finished even when it failed halfway.
        let closed = self.close();
        found.and(closed)?;

        Ok(objects)
    }
}
