use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Get,
    Add,
    Update,
    Replace,
    Delete,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Add => "add",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "list" => Some(Self::List),
            "get" => Some(Self::Get),
            "add" => Some(Self::Add),
            "update" => Some(Self::Update),
            "replace" => Some(Self::Replace),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn about(self) -> &'static str {
        match self {
            Self::List => "List entries (one page)",
            Self::Get => "Fetch one entry by --id or --name",
            Self::Add => "Create entries from flags or --file",
            Self::Update => "Patch one entry by --id or --name",
            Self::Replace => "Replace one entry by --id or --name",
            Self::Delete => "Delete one entry by --id or --name",
        }
    }

    /// Actions that send a payload.
    pub fn takes_payload(self) -> bool {
        matches!(self, Self::Add | Self::Update | Self::Replace)
    }

    pub fn takes_selector(self) -> bool {
        matches!(
            self,
            Self::Get | Self::Update | Self::Replace | Self::Delete
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-field normalisation applied to payloads before they are sent.
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub mac: &'static [&'static str],
    pub flags: &'static [&'static str],
    pub lists: &'static [&'static str],
    pub choices: &'static [(&'static str, &'static [&'static str])],
}

const NO_RULES: FieldRules = FieldRules {
    mac: &[],
    flags: &[],
    lists: &[],
    choices: &[],
};

#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    pub module: &'static str,
    /// Also the key into the API path table.
    pub name: &'static str,
    pub about: &'static str,
    pub actions: &'static [Action],
    pub required: &'static [&'static str],
    /// Optional payload fields exposed as `--<field>` flags.
    pub fields: &'static [&'static str],
    pub default_sort: &'static str,
    pub numeric_id: bool,
    pub rules: FieldRules,
}

impl ResourceSpec {
    pub fn supports(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    /// Every payload field with a dedicated flag, required ones first.
    pub fn payload_fields(&self) -> impl Iterator<Item = &'static str> {
        self.required.iter().chain(self.fields.iter()).copied()
    }
}

const CRUD: &[Action] = &[Action::List, Action::Get, Action::Add, Action::Delete];
const FULL: &[Action] = &[
    Action::List,
    Action::Get,
    Action::Add,
    Action::Update,
    Action::Replace,
    Action::Delete,
];
const READ_ONLY: &[Action] = &[Action::List, Action::Get];

pub const ENDPOINT_STATUSES: &[&str] = &["Known", "Unknown", "Disabled"];

pub static RESOURCES: &[ResourceSpec] = &[
    ResourceSpec {
        module: "policy-elements",
        name: "network-device",
        about: "Network access devices (NADs)",
        actions: FULL,
        required: &["name", "ip_address"],
        fields: &[
            "description",
            "vendor_name",
            "radius_secret",
            "tacacs_secret",
            "coa_capable",
            "coa_port",
        ],
        default_sort: "+id",
        numeric_id: true,
        rules: FieldRules {
            flags: &["coa_capable"],
            ..NO_RULES
        },
    },
    ResourceSpec {
        module: "policy-elements",
        name: "network-device-group",
        about: "Network device groups",
        actions: CRUD,
        required: &["name"],
        fields: &["description", "group_format", "value"],
        default_sort: "+id",
        numeric_id: true,
        rules: NO_RULES,
    },
    ResourceSpec {
        module: "policy-elements",
        name: "auth-method",
        about: "Authentication methods",
        actions: CRUD,
        required: &["name", "method_type"],
        fields: &["description", "inner_methods"],
        default_sort: "+id",
        numeric_id: true,
        rules: FieldRules {
            lists: &["inner_methods"],
            ..NO_RULES
        },
    },
    ResourceSpec {
        module: "policy-elements",
        name: "enforcement-profile",
        about: "Enforcement profiles",
        actions: READ_ONLY,
        required: &[],
        fields: &[],
        default_sort: "+id",
        numeric_id: true,
        rules: NO_RULES,
    },
    ResourceSpec {
        module: "identities",
        name: "endpoint",
        about: "Endpoints known to the policy manager",
        actions: FULL,
        required: &["mac_address", "status"],
        fields: &["description", "device_insight_tags", "randomized_mac"],
        default_sort: "+id",
        numeric_id: true,
        rules: FieldRules {
            mac: &["mac_address"],
            flags: &["randomized_mac"],
            lists: &["device_insight_tags"],
            choices: &[("status", ENDPOINT_STATUSES)],
        },
    },
    ResourceSpec {
        module: "identities",
        name: "device",
        about: "Registered guest devices",
        actions: CRUD,
        required: &["mac"],
        fields: &["visitor_name", "role_id", "enabled", "notes"],
        default_sort: "-id",
        numeric_id: true,
        rules: FieldRules {
            mac: &["mac"],
            flags: &["enabled"],
            ..NO_RULES
        },
    },
    ResourceSpec {
        module: "identities",
        name: "guest-user",
        about: "Guest user accounts",
        actions: CRUD,
        required: &["username", "password"],
        fields: &["visitor_name", "email", "role_id", "enabled"],
        default_sort: "+id",
        numeric_id: true,
        rules: FieldRules {
            flags: &["enabled"],
            ..NO_RULES
        },
    },
    ResourceSpec {
        module: "identities",
        name: "local-user",
        about: "Local user accounts",
        actions: CRUD,
        required: &["user_id", "username", "password", "role_name"],
        fields: &["enabled", "change_pwd_next_login"],
        default_sort: "+id",
        numeric_id: true,
        rules: FieldRules {
            flags: &["enabled", "change_pwd_next_login"],
            ..NO_RULES
        },
    },
    ResourceSpec {
        module: "identities",
        name: "api-client",
        about: "API clients (OAuth)",
        actions: CRUD,
        required: &["client_id"],
        fields: &[
            "client_secret",
            "client_description",
            "operator_profile",
            "grant_types",
            "enabled",
        ],
        default_sort: "+client_id",
        numeric_id: false,
        rules: FieldRules {
            flags: &["enabled"],
            lists: &["grant_types"],
            ..NO_RULES
        },
    },
    ResourceSpec {
        module: "certificates",
        name: "cert-trust-list",
        about: "Trusted CA certificates",
        actions: &[Action::List, Action::Get, Action::Delete],
        required: &[],
        fields: &[],
        default_sort: "+id",
        numeric_id: true,
        rules: NO_RULES,
    },
    ResourceSpec {
        module: "certificates",
        name: "server-cert",
        about: "Server certificates",
        actions: READ_ONLY,
        required: &[],
        fields: &[],
        default_sort: "+service_name",
        numeric_id: false,
        rules: NO_RULES,
    },
];

pub fn find_resource(name: &str) -> Option<&'static ResourceSpec> {
    RESOURCES.iter().find(|spec| spec.name == name)
}

pub fn modules() -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for spec in RESOURCES {
        if !out.contains(&spec.module) {
            out.push(spec.module);
        }
    }
    out
}

pub fn resources_in(module: &str) -> impl Iterator<Item = &'static ResourceSpec> + '_ {
    RESOURCES.iter().filter(move |spec| spec.module == module)
}
