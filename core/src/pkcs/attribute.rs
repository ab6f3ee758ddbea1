use pkcs11::types::*;

#[derive(Debug, Clone, Copy)]
pub(crate) enum ObjectClass {
    Certificate,
}

impl From<ObjectClass> for &'static CK_OBJECT_CLASS {
    fn from(class: ObjectClass) -> Self {
        match class {
            ObjectClass::Certificate => &CKO_CERTIFICATE,
        }
    }
}

macro_rules! attributes {
    ($($name:ident<$t:ty> => $cka:expr),*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub(crate) enum AttributeType {
            $($name,)*
        }

        #[derive(Debug)]
        pub(crate) enum Attribute {
            $($name($t),)*
        }

        impl From<&Attribute> for AttributeType {
            fn from(attribute: &Attribute) -> Self {
                match attribute {
                    $(Attribute::$name(_) => AttributeType::$name,)*
                }
            }
        }

        impl From<AttributeType> for CK_ATTRIBUTE_TYPE {
            fn from(ty: AttributeType) -> Self {
                match ty {
                    $(AttributeType::$name => $cka,)*
                }
            }
        }
    };
}

attributes![
    Class<ObjectClass> => CKA_CLASS,
    Label<String> => CKA_LABEL,
    Value<Vec<CK_BYTE>> => CKA_VALUE
];

impl From<&Attribute> for CK_ATTRIBUTE {
    fn from(attribute: &Attribute) -> Self {
        match attribute {
            Attribute::Class(class) => {
                let class: &'static CK_OBJECT_CLASS = (*class).into();
                CK_ATTRIBUTE::new(CKA_CLASS).with_ck_ulong(class)
            }
            Attribute::Label(label) => CK_ATTRIBUTE::new(CKA_LABEL).with_string(label),
            Attribute::Value(value) => CK_ATTRIBUTE::new(CKA_VALUE).with_bytes(value),
        }
    }
}

impl Attribute {
    /// Decodes the value read for the template.
    /// Returns `None` for attributes never read back from a token.
    pub(crate) fn decode(template: &CK_ATTRIBUTE, buffer: Vec<u8>) -> Option<Self> {
        match template.attrType {
            CKA_LABEL => Some(Self::Label(String::from_utf8_lossy(&buffer).into_owned())),
            CKA_VALUE => Some(Self::Value(buffer)),
            _ => None,
        }
    }

    pub(crate) fn ty(&self) -> AttributeType {
        self.into()
    }
}

pub(crate) struct Attributes {
    vec: Vec<Attribute>,
}

impl From<(Vec<CK_ATTRIBUTE>, Vec<Vec<u8>>)> for Attributes {
    fn from((template, buffers): (Vec<CK_ATTRIBUTE>, Vec<Vec<u8>>)) -> Self {
        Self {
            vec: template
                .iter()
                .zip(buffers)
                .filter_map(|(t, b)| Attribute::decode(t, b))
                .collect(),
        }
    }
}

impl Attributes {
    /// Takes the attribute of the type out, if it was read.
    pub(crate) fn take(mut self, ty: AttributeType) -> Option<Attribute> {
        let index = self.vec.iter().position(|attr| attr.ty() == ty)?;
        Some(self.vec.swap_remove(index))
    }
}
