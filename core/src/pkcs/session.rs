use pkcs11::types::*;
use pkcs11::Ctx;

use crate::pkcs::finder::Finder;
use crate::pkcs::Result;

/// An open session on a token, logged out and closed on drop.
#[derive(Debug)]
pub(crate) struct Session<'a> {
    ctx: &'a Ctx,
    handle: CK_SESSION_HANDLE,
}

impl<'a> Session<'a> {
    pub(crate) fn new(ctx: &'a Ctx, handle: CK_SESSION_HANDLE) -> Self {
        Self { ctx, handle }
    }

    pub(crate) fn login(&self, pin: &str) -> Result<()> {
        self.ctx.login(self.handle, CKU_USER, Some(pin))
    }

    pub(crate) fn finder(&self) -> Finder<'a> {
        Finder::new(self.ctx, self.handle)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        // Logging out fails when the login did not succeed.
        let _ = self.ctx.logout(self.handle);
        let _ = self.ctx.close_session(self.handle);
    }
}
