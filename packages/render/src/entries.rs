use std::collections::HashMap;

use model::Declaration;

/// Insertion-ordered `(kind, name) -> Declaration` map with replace-if-
/// richer semantics, used to fold the same declaration seen from multiple
/// compilation units (e.g. a header pulled into many `.cpp` files) down to
/// its single most complete occurrence.
#[derive(Default)]
pub struct EntriesStore {
    order: Vec<(String, String)>,
    index: HashMap<(String, String), usize>,
    entities: Vec<Declaration>,
}

impl EntriesStore {
    /// Insert `decl`, keeping whichever occurrence (the stored one or this
    /// one) has the strictly larger `fill_value`. Ties keep the first seen.
    pub fn insert(&mut self, decl: Declaration) {
        let key = (decl.kind().to_string(), decl.name().to_string());
        match self.index.get(&key) {
            Some(&i) => {
                if decl.fill_value() > self.entities[i].fill_value() {
                    self.entities[i] = decl;
                }
            }
            None => {
                self.index.insert(key.clone(), self.entities.len());
                self.order.push(key);
                self.entities.push(decl);
            }
        }
    }

    pub fn into_entities(self) -> Vec<Declaration> {
        self.entities
    }
}

#[cfg(test)]
mod tests {
    use model::{Accessibility, Struct};

    use super::*;

    fn struct_with(name: &str, members: usize) -> Declaration {
        Declaration::Struct(Struct {
            name: name.into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            members: (0..members)
                .map(|i| {
                    model::Member::Field(model::Field {
                        name: format!("f{i}").into(),
                        ty: model::Type::default(),
                        accessibility: Accessibility::Public,
                        is_static: false,
                        const_value: None,
                        array_size: None,
                        data_member_location: Some(i as u64),
                    })
                })
                .collect(),
        })
    }

    #[test]
    fn richer_occurrence_replaces_poorer() {
        let mut store = EntriesStore::default();
        store.insert(struct_with("Foo", 1));
        store.insert(struct_with("Foo", 3));
        store.insert(struct_with("Foo", 2));
        let entities = store.into_entities();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].fill_value(), 3);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut store = EntriesStore::default();
        store.insert(struct_with("B", 1));
        store.insert(struct_with("A", 1));
        let entities = store.into_entities();
        assert_eq!(entities[0].name().as_ref(), "B");
        assert_eq!(entities[1].name().as_ref(), "A");
    }
}
