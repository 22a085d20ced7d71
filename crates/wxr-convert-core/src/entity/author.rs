//! WordPress users from `<wp:author>`.

use super::post::put;
use super::{BagKind, Entity, EntityKind, EntityMut};
use crate::bag::Bag;
use crate::error::SchemaError;
use crate::router::FieldContext;
use crate::schema::{Schema, SchemaBuilder, Schemas};
use crate::xml::Element;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub id: u64,
    /// `wp:author_login`; the key posts refer to via `dc:creator`.
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    /// `first_name last_name`, whichever are present.
    pub full_name: String,
    pub fields: Bag,
}

impl Author {
    pub fn to_fields(&self) -> Bag {
        let mut bag = Bag::new();
        bag.insert("id", self.id.to_string());
        put(&mut bag, "username", &self.username);
        put(&mut bag, "email", &self.email);
        put(&mut bag, "display_name", &self.display_name);
        put(&mut bag, "first_name", &self.first_name);
        put(&mut bag, "last_name", &self.last_name);
        put(&mut bag, "full_name", &self.full_name);
        bag.merge_missing(&self.fields);
        bag
    }

    fn assemble_full_name(&mut self) {
        self.full_name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
    }
}

impl Entity for Author {
    const KIND: EntityKind = EntityKind::Author;

    fn schema(schemas: &Schemas) -> &Schema<Self> {
        &schemas.author
    }

    fn as_entity_mut(&mut self) -> EntityMut<'_> {
        EntityMut::Author(self)
    }

    fn bag_mut(&mut self, _bag: BagKind) -> &mut Bag {
        &mut self.fields
    }

    fn subject(&self) -> String {
        if self.username.is_empty() {
            format!("author #{}", self.id)
        } else {
            format!("author '{}'", self.username)
        }
    }
}

pub(crate) fn schema() -> Result<Schema<Author>, SchemaError> {
    SchemaBuilder::new("author", "^author_?")
        .handler("id", id)
        .handler("login", login)
        .handler("first_name", first_name)
        .handler("last_name", last_name)
        .property("email", |a: &mut Author, v| a.email = v.trim().to_string())
        .property("display_name", |a: &mut Author, v| a.display_name = v.trim().to_string())
        .build()
}

fn id(author: &mut Author, element: &Element, cx: &mut FieldContext<'_>) {
    let raw = element.text_content();
    match raw.trim().parse() {
        Ok(id) => author.id = id,
        Err(_) => cx.invalid_value(author.subject(), "author id", &raw),
    }
}

fn login(author: &mut Author, element: &Element, _cx: &mut FieldContext<'_>) {
    author.username = element.text_content().trim().to_string();
}

fn first_name(author: &mut Author, element: &Element, _cx: &mut FieldContext<'_>) {
    author.first_name = element.text_content().trim().to_string();
    author.assemble_full_name();
}

fn last_name(author: &mut Author, element: &Element, _cx: &mut FieldContext<'_>) {
    author.last_name = element.text_content().trim().to_string();
    author.assemble_full_name();
}
