use proc_macro2::Span;
use syn::{
    Attribute, Expr, ExprArray, Ident, Lit, LitBool, LitInt, LitStr, Path, Token,
    meta::ParseNestedMeta, spanned::Spanned,
};

pub(crate) struct SearchIndexAttr {
    pub name: Option<String>,
    pub token_separators: Option<Vec<String>>,
}

#[derive(Default)]
pub(crate) struct ContainerAttrs {
    /// `Some(None)` for a bare `#[collection]`.
    pub collection: Option<Option<String>>,
    pub search_index: Option<SearchIndexAttr>,
}

impl ContainerAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = ContainerAttrs::default();
        for attr in attrs {
            if attr.path().is_ident("collection") {
                let mut name = None;
                if !matches!(attr.meta, syn::Meta::Path(_)) {
                    attr.parse_nested_meta(|meta| {
                        if meta.path.is_ident("name") {
                            name = Some(string_value(&meta)?);
                            Ok(())
                        } else {
                            Err(meta.error("expected `name`"))
                        }
                    })?;
                }
                parsed.collection = Some(name);
            } else if attr.path().is_ident("search_index") {
                let mut index = SearchIndexAttr {
                    name: None,
                    token_separators: None,
                };
                if !matches!(attr.meta, syn::Meta::Path(_)) {
                    attr.parse_nested_meta(|meta| {
                        if meta.path.is_ident("name") {
                            index.name = Some(string_value(&meta)?);
                        } else if meta.path.is_ident("token_separators") {
                            let array: ExprArray = meta.value()?.parse()?;
                            let mut separators = Vec::new();
                            for element in array.elems {
                                match element {
                                    Expr::Lit(syn::ExprLit {
                                        lit: Lit::Str(separator),
                                        ..
                                    }) => separators.push(separator.value()),
                                    other => {
                                        return Err(syn::Error::new(
                                            other.span(),
                                            "token separators must be string literals",
                                        ));
                                    }
                                }
                            }
                            index.token_separators = Some(separators);
                        } else {
                            return Err(meta.error("expected `name` or `token_separators`"));
                        }
                        Ok(())
                    })?;
                }
                parsed.search_index = Some(index);
            }
        }
        Ok(parsed)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Collection,
    Search,
}

pub(crate) struct FieldAttr {
    pub span: Span,
    pub rename: Option<String>,
    pub field_type: Option<Ident>,
    pub items: Option<Ident>,
    pub model: Option<Path>,
    pub array_depth: Option<LitInt>,
    pub max_length: Option<LitInt>,
    pub default: Option<Lit>,
    pub generated: Option<Ident>,
    pub timestamp: Option<Ident>,
    pub search_index: Option<bool>,
    pub sort: Option<bool>,
    pub facet: Option<bool>,
    pub id: Option<bool>,
    pub dimensions: Option<LitInt>,
}

impl FieldAttr {
    fn parse(attr: &Attribute, kind: FieldKind) -> syn::Result<Self> {
        let mut parsed = FieldAttr {
            span: attr.span(),
            rename: None,
            field_type: None,
            items: None,
            model: None,
            array_depth: None,
            max_length: None,
            default: None,
            generated: None,
            timestamp: None,
            search_index: None,
            sort: None,
            facet: None,
            id: None,
            dimensions: None,
        };
        if matches!(attr.meta, syn::Meta::Path(_)) {
            return Ok(parsed);
        }

        attr.parse_nested_meta(|meta| {
            let key = meta
                .path
                .get_ident()
                .map(|ident| ident.to_string())
                .unwrap_or_default();
            match (key.as_str(), kind) {
                ("rename", _) => parsed.rename = Some(string_value(&meta)?),
                ("field_type", _) => parsed.field_type = Some(field_type_value(&meta)?),
                ("items", _) => parsed.items = Some(field_type_value(&meta)?),
                ("model", _) => parsed.model = Some(meta.value()?.parse()?),
                ("array_depth", _) => parsed.array_depth = Some(meta.value()?.parse()?),
                ("search_index", _) => parsed.search_index = Some(flag_value(&meta)?),
                ("sort", _) => parsed.sort = Some(flag_value(&meta)?),
                ("facet", _) => parsed.facet = Some(flag_value(&meta)?),
                ("max_length", FieldKind::Collection) => {
                    parsed.max_length = Some(meta.value()?.parse()?)
                }
                ("default", FieldKind::Collection) => parsed.default = Some(meta.value()?.parse()?),
                ("generated", FieldKind::Collection) => {
                    let value = meta.value()?.parse::<LitStr>()?;
                    let variant = match value.value().as_str() {
                        "now" => "Now",
                        "uuid" => "Uuid",
                        "cuid" => "Cuid",
                        _ => {
                            return Err(syn::Error::new(
                                value.span(),
                                "expected `now`, `uuid` or `cuid`",
                            ));
                        }
                    };
                    parsed.generated = Some(Ident::new(variant, value.span()));
                }
                ("timestamp", FieldKind::Collection) => {
                    let value = meta.value()?.parse::<LitStr>()?;
                    let variant = match value.value().as_str() {
                        "createdAt" => "CreatedAt",
                        "updatedAt" => "UpdatedAt",
                        _ => {
                            return Err(syn::Error::new(
                                value.span(),
                                "expected `createdAt` or `updatedAt`",
                            ));
                        }
                    };
                    parsed.timestamp = Some(Ident::new(variant, value.span()));
                }
                ("id", FieldKind::Search) => parsed.id = Some(flag_value(&meta)?),
                ("dimensions", FieldKind::Search) => {
                    parsed.dimensions = Some(meta.value()?.parse()?)
                }
                _ => return Err(meta.error(format!("unsupported attribute `{key}`"))),
            }
            Ok(())
        })?;

        if parsed.default.is_some() && parsed.generated.is_some() {
            return Err(syn::Error::new(
                parsed.span,
                "`default` and `generated` are mutually exclusive",
            ));
        }
        Ok(parsed)
    }
}

pub(crate) struct PrimaryKeyAttr {
    pub order: Option<LitInt>,
    pub auto_generate: bool,
}

#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub field: Option<FieldAttr>,
    pub search_field: Option<FieldAttr>,
    pub primary_key: Option<PrimaryKeyAttr>,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = FieldAttrs::default();
        for attr in attrs {
            if attr.path().is_ident("field") {
                parsed.field = Some(FieldAttr::parse(attr, FieldKind::Collection)?);
            } else if attr.path().is_ident("search_field") {
                parsed.search_field = Some(FieldAttr::parse(attr, FieldKind::Search)?);
            } else if attr.path().is_ident("primary_key") {
                let mut key = PrimaryKeyAttr {
                    order: None,
                    auto_generate: false,
                };
                if !matches!(attr.meta, syn::Meta::Path(_)) {
                    attr.parse_nested_meta(|meta| {
                        if meta.path.is_ident("order") {
                            key.order = Some(meta.value()?.parse()?);
                        } else if meta.path.is_ident("auto_generate") {
                            key.auto_generate = flag_value(&meta)?;
                        } else {
                            return Err(meta.error("expected `order` or `auto_generate`"));
                        }
                        Ok(())
                    })?;
                }
                parsed.primary_key = Some(key);
            }
        }
        Ok(parsed)
    }

    pub fn is_empty(&self) -> bool {
        self.field.is_none() && self.search_field.is_none() && self.primary_key.is_none()
    }
}

fn string_value(meta: &ParseNestedMeta) -> syn::Result<String> {
    Ok(meta.value()?.parse::<LitStr>()?.value())
}

// 单独的 `facet` 等同于 `facet = true`
fn flag_value(meta: &ParseNestedMeta) -> syn::Result<bool> {
    if meta.input.peek(Token![=]) {
        Ok(meta.value()?.parse::<LitBool>()?.value)
    } else {
        Ok(true)
    }
}

fn field_type_value(meta: &ParseNestedMeta) -> syn::Result<Ident> {
    let value = meta.value()?.parse::<LitStr>()?;
    let variant = match value.value().as_str() {
        "string" => "String",
        "boolean" => "Boolean",
        "number" => "Number",
        "double" => "Double",
        "int32" => "Int32",
        "int64" => "Int64",
        "uuid" => "Uuid",
        "byte" => "Bytes",
        "date-time" => "DateTime",
        "array" => "Array",
        "object" => "Object",
        other => {
            return Err(syn::Error::new(
                value.span(),
                format!("unknown field type `{other}`"),
            ));
        }
    };
    Ok(Ident::new(variant, value.span()))
}
