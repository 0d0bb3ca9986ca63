use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input, spanned::Spanned};

mod attrs;

use attrs::{ContainerAttrs, FieldAttr, FieldAttrs, PrimaryKeyAttr};

/// 派生 `doc_entity::DocModel`
///
/// 容器属性：`#[collection]` / `#[collection(name = "...")]` 和
/// `#[search_index(name = "...", token_separators = ["-"])]`。
/// 字段属性：`#[field(...)]`、`#[search_field(...)]` 和
/// `#[primary_key(order = 1, auto_generate)]`，没有这些属性的字段不参与 schema。
#[proc_macro_derive(
    DocModel,
    attributes(collection, search_index, field, search_field, primary_key)
)]
pub fn derive_doc_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "DocModel cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => fields.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new(
                    input.span(),
                    "DocModel requires named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "DocModel can only be derived for structs",
            ));
        }
    };

    // 解析容器属性，名称默认取结构体名的 snake_case
    let container = ContainerAttrs::parse(&input.attrs)?;

    let collection = container.collection.map(|name| {
        let name = name.unwrap_or_else(|| to_snake_case(&struct_name.to_string()));
        quote! { store.add_collection(#name, target); }
    });

    let search_index = container.search_index.map(|index| {
        let name = index
            .name
            .unwrap_or_else(|| to_snake_case(&struct_name.to_string()));
        let token_separators = match index.token_separators {
            Some(separators) => quote! {
                ::core::option::Option::Some(::std::vec![#(#separators.to_string()),*])
            },
            None => quote! { ::core::option::Option::None },
        };
        quote! {
            store.add_search_index(::doc_entity::SearchIndexMetadata {
                name: #name.to_string(),
                target,
                options: ::doc_entity::SearchIndexOptions {
                    token_separators: #token_separators,
                },
            });
        }
    });

    let mut registrations = Vec::new();
    let mut declarations = Vec::new();
    for field in fields {
        let attrs = FieldAttrs::parse(&field.attrs)?;
        if attrs.is_empty() {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let native_type = quote!(#ty).to_string();

        let field_name = attrs
            .field
            .as_ref()
            .and_then(|field| field.rename.clone())
            .unwrap_or_else(|| ident.to_string());

        // 嵌入的模型要先于当前模型注册
        for model in [&attrs.field, &attrs.search_field]
            .into_iter()
            .flatten()
            .filter_map(|attr| attr.model.as_ref())
        {
            registrations.push(quote! { store.register::<#model>()?; });
        }

        if let Some(field) = &attrs.field {
            let decl = field_decl(
                quote!(::doc_entity::CollectionFieldDecl),
                &field_name,
                &native_type,
                field,
            );
            declarations.push(quote! { store.declare_field(target, #decl)?; });
        }

        if let Some(search_field) = &attrs.search_field {
            let name = search_field
                .rename
                .clone()
                .unwrap_or_else(|| field_name.clone());
            let decl = field_decl(
                quote!(::doc_entity::SearchFieldDecl),
                &name,
                &native_type,
                search_field,
            );
            declarations.push(quote! { store.declare_search_field(target, #decl)?; });
        }

        if let Some(primary_key) = &attrs.primary_key {
            // 主键沿用 #[field] 上显式指定的类型
            let explicit = attrs.field.as_ref().and_then(|field| field.field_type.as_ref());
            let decl = primary_key_decl(&field_name, &native_type, explicit, primary_key);
            declarations.push(quote! { store.declare_primary_key(target, #decl)?; });
        }
    }

    Ok(quote! {
        impl ::doc_entity::DocModel for #struct_name {
            fn type_path() -> ::doc_entity::TypePath {
                ::doc_entity::TypePath(concat!(module_path!(), "::", stringify!(#struct_name)))
            }

            fn declare(
                store: &mut ::doc_entity::MetadataStore,
            ) -> ::core::result::Result<(), ::doc_entity::Error> {
                let target = <Self as ::doc_entity::DocModel>::type_path();
                #(#registrations)*
                #collection
                #search_index
                #(#declarations)*
                ::core::result::Result::Ok(())
            }
        }

        ::doc_entity::inventory::submit! {
            ::doc_entity::ModelRegistration {
                type_path: concat!(module_path!(), "::", stringify!(#struct_name)),
                declare: <#struct_name as ::doc_entity::DocModel>::declare,
            }
        }
    })
}

fn field_decl(
    decl_type: TokenStream2,
    name: &str,
    native_type: &str,
    attr: &FieldAttr,
) -> TokenStream2 {
    let mut calls = Vec::new();
    if let Some(field_type) = &attr.field_type {
        calls.push(quote! { .field_type(::doc_entity::FieldType::#field_type) });
    }
    if let Some(items) = &attr.items {
        calls.push(quote! { .items(::doc_entity::FieldType::#items) });
    }
    if let Some(model) = &attr.model {
        calls.push(quote! { .model(<#model as ::doc_entity::DocModel>::type_path()) });
    }
    if let Some(depth) = &attr.array_depth {
        calls.push(quote! { .array_depth(#depth) });
    }
    if let Some(max_length) = &attr.max_length {
        calls.push(quote! { .max_length(#max_length) });
    }
    if let Some(default) = &attr.default {
        calls.push(quote! { .default_value(::doc_entity::DefaultValue::literal(#default)) });
    }
    if let Some(generated) = &attr.generated {
        calls.push(quote! { .default_value(::doc_entity::Generated::#generated) });
    }
    if let Some(timestamp) = &attr.timestamp {
        calls.push(quote! { .timestamp(::doc_entity::Timestamp::#timestamp) });
    }
    for (method, flag) in [
        ("search_index", attr.search_index),
        ("sort", attr.sort),
        ("facet", attr.facet),
        ("id", attr.id),
    ] {
        if let Some(flag) = flag {
            let method = syn::Ident::new(method, attr.span);
            calls.push(quote! { .#method(#flag) });
        }
    }
    if let Some(dimensions) = &attr.dimensions {
        calls.push(quote! { .dimensions(#dimensions) });
    }

    quote! {
        #decl_type::new(#name)
            .native_type(#native_type)
            #(#calls)*
    }
}

fn primary_key_decl(
    name: &str,
    native_type: &str,
    explicit: Option<&syn::Ident>,
    attr: &PrimaryKeyAttr,
) -> TokenStream2 {
    let field_type =
        explicit.map(|field_type| quote! { .field_type(::doc_entity::FieldType::#field_type) });
    let order = attr.order.as_ref().map(|order| quote! { .order(#order) });
    let auto_generate = attr.auto_generate;
    quote! {
        ::doc_entity::PrimaryKeyDecl::new(#name)
            .native_type(#native_type)
            #field_type
            #order
            .auto_generate(#auto_generate)
    }
}

fn to_snake_case(name: &str) -> String {
    let mut snake = String::with_capacity(name.len() + 4);
    for (i, ch) in name.char_indices() {
        if ch.is_uppercase() {
            if i > 0 {
                snake.push('_');
            }
            snake.extend(ch.to_lowercase());
        } else {
            snake.push(ch);
        }
    }
    snake
}
