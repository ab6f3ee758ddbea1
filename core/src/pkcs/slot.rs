use pkcs11::types::{
    CKF_RW_SESSION, CKF_SERIAL_SESSION, CK_FLAGS, CK_NOTIFY, CK_SLOT_ID, CK_VOID_PTR,
};
use pkcs11::Ctx;

use crate::pkcs::session::Session;
use crate::pkcs::Result;

#[derive(Debug)]
pub(crate) struct OpenSessionCfg {
    flags: CK_FLAGS,
    application: Option<CK_VOID_PTR>,
    notify: CK_NOTIFY,
}

impl Default for OpenSessionCfg {
    fn default() -> Self {
        Self {
            flags: CKF_SERIAL_SESSION | CKF_RW_SESSION,
            application: None,
            notify: CK_NOTIFY::None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Slot<'a> {
    ctx: &'a Ctx,
    id: CK_SLOT_ID,
}

impl<'a> Slot<'a> {
    pub(crate) fn new(ctx: &'a Ctx, id: CK_SLOT_ID) -> Self {
        Self { ctx, id }
    }

    pub(crate) fn id(&self) -> CK_SLOT_ID {
        self.id
    }

    pub(crate) fn open_session(&self, cfg: OpenSessionCfg) -> Result<Session<'a>> {
        Ok(Session::new(
            self.ctx,
            self.ctx
                .open_session(self.id, cfg.flags, cfg.application, cfg.notify)?,
        ))
    }
}
