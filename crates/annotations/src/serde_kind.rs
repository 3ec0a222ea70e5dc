use serde::de::{Error as DeError, Visitor};
use serde::{Deserializer, Serializer};

use crate::tree::NodeKind;

/// Serialises a `NodeKind` into its wire name (`"dir"`, `"file"`, or the
/// bare lowercase extension).
/// 將 `NodeKind` 序列化為磁碟格式的字串（`"dir"`、`"file"` 或副檔名）。
pub fn serialize<S>(kind: &NodeKind, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(kind.wire_name())
}

/// Deserialises a `NodeKind` from a wire name produced by [`serialize`].
/// 從上述序列化結果還原 `NodeKind`。
pub fn deserialize<'de, D>(deserializer: D) -> Result<NodeKind, D::Error>
where
    D: Deserializer<'de>,
{
    struct KindVisitor;

    impl<'de> Visitor<'de> for KindVisitor {
        type Value = NodeKind;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a node kind string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(NodeKind::from_wire(v))
        }

        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(NodeKind::from_wire(&v))
        }
    }

    deserializer.deserialize_str(KindVisitor)
}
