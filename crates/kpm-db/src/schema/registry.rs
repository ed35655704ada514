diesel::table! {
    packages (id) {
        id -> BigInt,
        name -> Text,
        admin -> Text,
        description -> Text,
        published_at -> Text,
    }
}
