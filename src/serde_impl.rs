//! `serde` support, gated behind the `serde` feature: a table serializes as
//! a plain map of its entries and deserializes back into a fresh table using
//! the target type's default hasher and strategy.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::table::RobinTable;

impl<K, V, S> Serialize for RobinTable<K, V, S>
where
    K: Serialize + Hash + Eq,
    V: Serialize,
    S: BuildHasher,
{
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for item in self.iter() {
            let (k, v) = item.map_err(serde::ser::Error::custom)?;
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct RobinTableVisitor<K, V, S> {
    marker: PhantomData<fn() -> RobinTable<K, V, S>>,
}

impl<'de, K, V, S> Visitor<'de> for RobinTableVisitor<K, V, S>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
{
    type Value = RobinTable<K, V, S>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of key/value pairs")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut table =
            RobinTable::with_capacity_and_hasher(access.size_hint().unwrap_or(0), S::default());
        while let Some((key, value)) = access.next_entry()? {
            table.set(key, value);
        }
        Ok(table)
    }
}

impl<'de, K, V, S> Deserialize<'de> for RobinTable<K, V, S>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RobinTableVisitor {
            marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RobinTable;

    #[test]
    fn round_trips_through_json() {
        let mut t: RobinTable<String, i32> = RobinTable::new();
        t.set("a".to_string(), 1);
        t.set("b".to_string(), 2);
        let json = serde_json::to_string(&t).unwrap();
        let back: RobinTable<String, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.get("a"), Some(&1));
        assert_eq!(back.get("b"), Some(&2));
    }
}
