use asc_core::{ApiMethod, DEFAULT_MAX_PAGES, QueryParams, RequestDescriptor};
use serde_json::{Map, Value, json};

use crate::args::{
    ToolError, arg_bool, arg_bounded_u64, arg_optional_bool, arg_optional_enum,
    arg_optional_string, arg_present_string, normalize_api_path, parse_query_params,
    required_enum, required_id, required_string, required_string_array,
};

const MAX_PAGE_SIZE: u64 = 200;
const MAX_PAGES_LIMIT: u64 = 50;
const DEFAULT_PRIMARY_LOCALE: &str = "en-US";
const DEFAULT_RELEASE_TYPE: &str = "AFTER_APPROVAL";

const VERSION_PLATFORMS: &[&str] = &["IOS", "MAC_OS", "TV_OS", "VISION_OS"];
const RELEASE_TYPES: &[&str] = &["MANUAL", "AFTER_APPROVAL", "SCHEDULED"];
const BUILD_PROCESSING_STATES: &[&str] = &["PROCESSING", "FAILED", "INVALID", "VALID"];
const BUNDLE_ID_PLATFORMS: &[&str] = &["IOS", "MAC_OS", "UNIVERSAL"];
const DEVICE_PLATFORMS: &[&str] = &["IOS", "MAC_OS"];
const DEVICE_STATUSES: &[&str] = &["ENABLED", "DISABLED"];
const API_METHODS: &[&str] = &["GET", "POST", "PATCH", "DELETE"];

const LOCALIZATION_TEXT_FIELDS: [&str; 6] = [
    "description",
    "keywords",
    "whatsNew",
    "promotionalText",
    "marketingUrl",
    "supportUrl",
];

type ToolArgs = Map<String, Value>;

pub(crate) struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    /// Maps validated arguments to the call to make. Never touches the network.
    pub build: fn(&ToolArgs) -> Result<ToolCall, ToolError>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ToolCall {
    pub request: RequestDescriptor,
    pub mode: CallMode,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CallMode {
    /// One request; the Normalized Response is returned.
    Single,
    /// Follow `links.next` up to the page cap.
    AllPages { max_pages: u32 },
    /// One request whose body is discarded in favour of a fixed acknowledgement.
    Acknowledge { message: String },
}

impl ToolCall {
    fn single(request: RequestDescriptor) -> Self {
        Self {
            request,
            mode: CallMode::Single,
        }
    }

    fn acknowledge(request: RequestDescriptor, message: String) -> Self {
        Self {
            request,
            mode: CallMode::Acknowledge { message },
        }
    }

    /// GET with the paging arguments every list tool accepts.
    fn list(args: &ToolArgs, path: String, mut params: QueryParams) -> Result<Self, ToolError> {
        let limit = arg_bounded_u64(args, "limit", 1, MAX_PAGE_SIZE)?;
        params.set_opt("limit", limit.map(|limit| limit.to_string()));

        let mode = if arg_bool(args, "all_pages", false)? {
            let max_pages = arg_bounded_u64(args, "max_pages", 1, MAX_PAGES_LIMIT)?
                .map_or(DEFAULT_MAX_PAGES, |pages| pages as u32);
            CallMode::AllPages { max_pages }
        } else {
            CallMode::Single
        };

        Ok(Self {
            request: RequestDescriptor::get(path).with_params(params),
            mode,
        })
    }
}

pub(crate) fn find_tool(name: &str) -> Option<ToolDefinition> {
    tool_definitions().into_iter().find(|tool| tool.name == name)
}

fn list_properties(mut properties: Value) -> Value {
    properties["limit"] = json!({
        "type": "integer",
        "minimum": 1,
        "maximum": MAX_PAGE_SIZE,
        "description": "Page size (max 200)"
    });
    properties["all_pages"] = json!({
        "type": "boolean",
        "default": false,
        "description": "Follow links.next and aggregate every page"
    });
    properties["max_pages"] = json!({
        "type": "integer",
        "minimum": 1,
        "maximum": MAX_PAGES_LIMIT,
        "default": DEFAULT_MAX_PAGES,
        "description": "Page cap when all_pages is set; capped results carry meta.paging.truncated"
    });
    properties
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

pub(crate) fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_apps",
            description: "List all apps in App Store Connect. Returns app ID, name, bundle ID, SKU, and platform.",
            input_schema: object_schema(
                list_properties(json!({
                    "filter_bundleId": { "type": "string", "description": "Filter by bundle ID (e.g., com.example.app)" },
                    "filter_name": { "type": "string", "description": "Filter by app name" },
                    "include": { "type": "string", "description": "Comma-separated related resources to include (e.g., appStoreVersions,builds,betaGroups)" }
                })),
                &[],
            ),
            build: build_list_apps,
        },
        ToolDefinition {
            name: "get_app",
            description: "Get detailed info for a specific app by its App Store Connect ID. Supports includes for related resources.",
            input_schema: object_schema(
                json!({
                    "app_id": { "type": "string", "description": "The App Store Connect app ID" },
                    "include": { "type": "string", "description": "Comma-separated related resources to include (e.g., appStoreVersions,builds,betaGroups,appInfos)" },
                    "fields_apps": { "type": "string", "description": "Comma-separated fields to return for apps (e.g., name,bundleId,sku,primaryLocale)" }
                }),
                &["app_id"],
            ),
            build: build_get_app,
        },
        ToolDefinition {
            name: "create_app",
            description: "Create a new app in App Store Connect.",
            input_schema: object_schema(
                json!({
                    "name": { "type": "string", "description": "The name of the app" },
                    "bundleId": { "type": "string", "description": "The bundle ID (must match a registered bundle ID)" },
                    "sku": { "type": "string", "description": "A unique SKU for the app" },
                    "primaryLocale": { "type": "string", "default": DEFAULT_PRIMARY_LOCALE, "description": "Primary locale (default: en-US)" },
                    "bundleId_resource_id": { "type": "string", "description": "The App Store Connect ID of the registered bundle ID resource" }
                }),
                &["name", "bundleId", "sku", "bundleId_resource_id"],
            ),
            build: build_create_app,
        },
        ToolDefinition {
            name: "list_app_store_versions",
            description: "List all App Store versions for an app. Includes version string, state, and platform.",
            input_schema: object_schema(
                list_properties(json!({
                    "app_id": { "type": "string", "description": "The App Store Connect app ID" },
                    "filter_versionString": { "type": "string", "description": "Filter by version string (e.g., 1.0.0)" },
                    "filter_platform": { "type": "string", "enum": VERSION_PLATFORMS, "description": "Filter by platform" },
                    "filter_appStoreState": { "type": "string", "description": "Filter by state (e.g., READY_FOR_SALE, PREPARE_FOR_SUBMISSION, WAITING_FOR_REVIEW)" },
                    "include": { "type": "string", "description": "Comma-separated includes (e.g., appStoreVersionLocalizations,build,appStoreVersionSubmission)" }
                })),
                &["app_id"],
            ),
            build: build_list_app_store_versions,
        },
        ToolDefinition {
            name: "create_app_store_version",
            description: "Create a new App Store version for an app.",
            input_schema: object_schema(
                json!({
                    "app_id": { "type": "string", "description": "The App Store Connect app ID" },
                    "versionString": { "type": "string", "description": "The version string (e.g., 1.2.0)" },
                    "platform": { "type": "string", "enum": VERSION_PLATFORMS, "description": "The platform" },
                    "releaseType": { "type": "string", "enum": RELEASE_TYPES, "default": DEFAULT_RELEASE_TYPE, "description": "Release type (default: AFTER_APPROVAL)" },
                    "copyright": { "type": "string", "description": "Copyright text" },
                    "earliestReleaseDate": { "type": "string", "description": "Earliest release date (ISO 8601), only for SCHEDULED release type" }
                }),
                &["app_id", "versionString", "platform"],
            ),
            build: build_create_app_store_version,
        },
        ToolDefinition {
            name: "update_app_store_version",
            description: "Update an existing App Store version (e.g., change version string, copyright, release type).",
            input_schema: object_schema(
                json!({
                    "version_id": { "type": "string", "description": "The App Store version ID" },
                    "versionString": { "type": "string", "description": "New version string" },
                    "copyright": { "type": "string", "description": "Copyright text" },
                    "releaseType": { "type": "string", "enum": RELEASE_TYPES, "description": "Release type" },
                    "earliestReleaseDate": { "type": "string", "description": "Earliest release date (ISO 8601)" }
                }),
                &["version_id"],
            ),
            build: build_update_app_store_version,
        },
        ToolDefinition {
            name: "list_version_localizations",
            description: "List all localizations for an App Store version. Returns description, keywords, whatsNew, promotional text, etc. for each locale.",
            input_schema: object_schema(
                list_properties(json!({
                    "version_id": { "type": "string", "description": "The App Store version ID" }
                })),
                &["version_id"],
            ),
            build: build_list_version_localizations,
        },
        ToolDefinition {
            name: "get_version_localization",
            description: "Get a specific version localization by ID. Returns all localization fields.",
            input_schema: object_schema(
                json!({
                    "localization_id": { "type": "string", "description": "The localization ID" }
                }),
                &["localization_id"],
            ),
            build: build_get_version_localization,
        },
        ToolDefinition {
            name: "create_version_localization",
            description: "Create a new localization for an App Store version. Use this to add a new locale (e.g., fr-FR, de-DE).",
            input_schema: object_schema(
                localization_text_properties(json!({
                    "version_id": { "type": "string", "description": "The App Store version ID" },
                    "locale": { "type": "string", "description": "Locale code (e.g., en-US, fr-FR, de-DE, ja)" }
                })),
                &["version_id", "locale"],
            ),
            build: build_create_version_localization,
        },
        ToolDefinition {
            name: "update_version_localization",
            description: "Update an existing version localization. Use this to set or change description, keywords, whatsNew, promotional text, URLs.",
            input_schema: object_schema(
                localization_text_properties(json!({
                    "localization_id": { "type": "string", "description": "The localization ID" }
                })),
                &["localization_id"],
            ),
            build: build_update_version_localization,
        },
        ToolDefinition {
            name: "list_builds",
            description: "List builds for an app. Returns build number, version, processing state, and upload date.",
            input_schema: object_schema(
                list_properties(json!({
                    "app_id": { "type": "string", "description": "The App Store Connect app ID" },
                    "filter_version": { "type": "string", "description": "Filter by version string" },
                    "filter_processingState": { "type": "string", "enum": BUILD_PROCESSING_STATES, "description": "Filter by processing state" },
                    "filter_expired": { "type": "boolean", "description": "Filter by expired status" },
                    "include": { "type": "string", "description": "Comma-separated includes (e.g., app,betaAppReviewSubmission,buildBetaDetail,preReleaseVersion)" },
                    "sort": { "type": "string", "description": "Sort field (e.g., -uploadedDate for newest first, uploadedDate for oldest first)" }
                })),
                &["app_id"],
            ),
            build: build_list_builds,
        },
        ToolDefinition {
            name: "add_build_to_beta_group",
            description: "Add a build to a beta group for TestFlight distribution.",
            input_schema: object_schema(
                json!({
                    "beta_group_id": { "type": "string", "description": "The beta group ID" },
                    "build_ids": { "type": "array", "items": { "type": "string" }, "minItems": 1, "description": "Array of build IDs to add" }
                }),
                &["beta_group_id", "build_ids"],
            ),
            build: build_add_build_to_beta_group,
        },
        ToolDefinition {
            name: "list_bundle_ids",
            description: "List registered bundle IDs in App Store Connect.",
            input_schema: object_schema(
                list_properties(json!({
                    "filter_identifier": { "type": "string", "description": "Filter by bundle identifier (e.g., com.example.*)" },
                    "filter_name": { "type": "string", "description": "Filter by name" },
                    "filter_platform": { "type": "string", "enum": BUNDLE_ID_PLATFORMS, "description": "Filter by platform" },
                    "include": { "type": "string", "description": "Comma-separated includes (e.g., bundleIdCapabilities,profiles,app)" }
                })),
                &[],
            ),
            build: build_list_bundle_ids,
        },
        ToolDefinition {
            name: "register_bundle_id",
            description: "Register a new bundle ID in App Store Connect.",
            input_schema: object_schema(
                json!({
                    "name": { "type": "string", "description": "A descriptive name for the bundle ID" },
                    "identifier": { "type": "string", "description": "The bundle identifier (e.g., com.example.myapp)" },
                    "platform": { "type": "string", "enum": BUNDLE_ID_PLATFORMS, "description": "The platform" }
                }),
                &["name", "identifier", "platform"],
            ),
            build: build_register_bundle_id,
        },
        ToolDefinition {
            name: "list_bundle_id_capabilities",
            description: "List capabilities enabled for a bundle ID.",
            input_schema: object_schema(
                list_properties(json!({
                    "bundle_id": { "type": "string", "description": "The bundle ID resource ID" }
                })),
                &["bundle_id"],
            ),
            build: build_list_bundle_id_capabilities,
        },
        ToolDefinition {
            name: "enable_bundle_id_capability",
            description: "Enable a capability for a bundle ID (e.g., push notifications, sign in with Apple).",
            input_schema: object_schema(
                json!({
                    "bundle_id": { "type": "string", "description": "The bundle ID resource ID" },
                    "capabilityType": { "type": "string", "description": "Capability type (e.g., PUSH_NOTIFICATIONS, SIGN_IN_WITH_APPLE, ASSOCIATED_DOMAINS, IN_APP_PURCHASE, GAME_CENTER)" }
                }),
                &["bundle_id", "capabilityType"],
            ),
            build: build_enable_bundle_id_capability,
        },
        ToolDefinition {
            name: "disable_bundle_id_capability",
            description: "Disable (delete) a capability from a bundle ID.",
            input_schema: object_schema(
                json!({
                    "capability_id": { "type": "string", "description": "The capability ID to disable" }
                }),
                &["capability_id"],
            ),
            build: build_disable_bundle_id_capability,
        },
        ToolDefinition {
            name: "create_app_store_version_submission",
            description: "Submit an App Store version for review.",
            input_schema: object_schema(
                json!({
                    "version_id": { "type": "string", "description": "The App Store version ID to submit" }
                }),
                &["version_id"],
            ),
            build: build_create_app_store_version_submission,
        },
        ToolDefinition {
            name: "list_users",
            description: "List users in your App Store Connect team.",
            input_schema: object_schema(
                list_properties(json!({
                    "filter_roles": { "type": "string", "description": "Comma-separated roles to filter by (e.g., ADMIN,APP_MANAGER,DEVELOPER)" },
                    "filter_username": { "type": "string", "description": "Filter by username (email)" },
                    "include": { "type": "string", "description": "Comma-separated includes (e.g., visibleApps)" }
                })),
                &[],
            ),
            build: build_list_users,
        },
        ToolDefinition {
            name: "list_devices",
            description: "List registered devices.",
            input_schema: object_schema(
                list_properties(json!({
                    "filter_name": { "type": "string", "description": "Filter by device name" },
                    "filter_platform": { "type": "string", "enum": DEVICE_PLATFORMS, "description": "Filter by platform" },
                    "filter_status": { "type": "string", "enum": DEVICE_STATUSES, "description": "Filter by status" },
                    "filter_udid": { "type": "string", "description": "Filter by UDID" }
                })),
                &[],
            ),
            build: build_list_devices,
        },
        ToolDefinition {
            name: "api_request",
            description: "Make an arbitrary request to the App Store Connect API. Use this for any endpoint not covered by a dedicated tool. Base URL is https://api.appstoreconnect.apple.com; provide only the path (e.g., /v1/apps, /v2/inAppPurchases). Auth is handled automatically. See https://developer.apple.com/documentation/appstoreconnectapi for full API docs.",
            input_schema: object_schema(
                json!({
                    "method": { "type": "string", "enum": API_METHODS, "description": "HTTP method" },
                    "path": { "type": "string", "description": "API path (e.g., /v1/apps, /v1/apps/{id}/appStoreVersions, /v2/inAppPurchases)" },
                    "params": {
                        "type": "object",
                        "additionalProperties": { "type": "string" },
                        "description": "Query parameters as key-value pairs (e.g., {\"filter[bundleId]\": \"com.example.app\", \"include\": \"appStoreVersions\", \"limit\": \"10\"})"
                    },
                    "body": { "type": "string", "description": "Request body as a JSON string for POST/PATCH/DELETE requests. Must follow the JSON:API format used by App Store Connect." }
                }),
                &["method", "path"],
            ),
            build: build_api_request,
        },
    ]
}

fn localization_text_properties(mut properties: Value) -> Value {
    properties["description"] = json!({ "type": "string", "description": "App description for this locale" });
    properties["keywords"] = json!({ "type": "string", "description": "Comma-separated keywords (max 100 chars)" });
    properties["whatsNew"] = json!({ "type": "string", "description": "What's new in this version (release notes)" });
    properties["promotionalText"] = json!({ "type": "string", "description": "Promotional text (can be updated without a new version)" });
    properties["marketingUrl"] = json!({ "type": "string", "description": "Marketing URL" });
    properties["supportUrl"] = json!({ "type": "string", "description": "Support URL" });
    properties
}

/// JSON:API `{data: {type, id}}` linkage.
fn linkage(resource_type: &str, id: &str) -> Value {
    json!({ "data": { "type": resource_type, "id": id } })
}

fn build_list_apps(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let mut params = QueryParams::new();
    params
        .set_opt("filter[bundleId]", arg_optional_string(args, "filter_bundleId")?)
        .set_opt("filter[name]", arg_optional_string(args, "filter_name")?)
        .set_opt("include", arg_optional_string(args, "include")?);
    ToolCall::list(args, "/v1/apps".to_string(), params)
}

fn build_get_app(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let app_id = required_id(args, "app_id")?;
    let mut params = QueryParams::new();
    params
        .set_opt("include", arg_optional_string(args, "include")?)
        .set_opt("fields[apps]", arg_optional_string(args, "fields_apps")?);
    Ok(ToolCall::single(
        RequestDescriptor::get(format!("/v1/apps/{app_id}")).with_params(params),
    ))
}

fn build_create_app(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let name = required_string(args, "name")?;
    let bundle_id = required_string(args, "bundleId")?;
    let sku = required_string(args, "sku")?;
    let primary_locale = arg_optional_string(args, "primaryLocale")?
        .unwrap_or_else(|| DEFAULT_PRIMARY_LOCALE.to_string());
    let bundle_resource_id = required_string(args, "bundleId_resource_id")?;

    let body = json!({
        "data": {
            "type": "apps",
            "attributes": {
                "name": name,
                "sku": sku,
                "primaryLocale": primary_locale,
                "bundleId": bundle_id
            },
            "relationships": {
                "bundleId": linkage("bundleIds", &bundle_resource_id)
            }
        }
    });
    Ok(ToolCall::single(RequestDescriptor::post("/v1/apps", body)))
}

fn build_list_app_store_versions(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let app_id = required_id(args, "app_id")?;
    let mut params = QueryParams::new();
    params
        .set_opt("filter[versionString]", arg_optional_string(args, "filter_versionString")?)
        .set_opt(
            "filter[platform]",
            arg_optional_enum(args, "filter_platform", VERSION_PLATFORMS)?,
        )
        .set_opt("filter[appStoreState]", arg_optional_string(args, "filter_appStoreState")?)
        .set_opt("include", arg_optional_string(args, "include")?);
    ToolCall::list(args, format!("/v1/apps/{app_id}/appStoreVersions"), params)
}

fn build_create_app_store_version(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let app_id = required_string(args, "app_id")?;
    let version_string = required_string(args, "versionString")?;
    let platform = required_enum(args, "platform", VERSION_PLATFORMS)?;
    let release_type = arg_optional_enum(args, "releaseType", RELEASE_TYPES)?
        .unwrap_or_else(|| DEFAULT_RELEASE_TYPE.to_string());

    let mut attributes = Map::new();
    attributes.insert("versionString".to_string(), Value::String(version_string));
    attributes.insert("platform".to_string(), Value::String(platform));
    attributes.insert("releaseType".to_string(), Value::String(release_type));
    for key in ["copyright", "earliestReleaseDate"] {
        if let Some(value) = arg_optional_string(args, key)? {
            attributes.insert(key.to_string(), Value::String(value));
        }
    }

    let body = json!({
        "data": {
            "type": "appStoreVersions",
            "attributes": attributes,
            "relationships": {
                "app": linkage("apps", &app_id)
            }
        }
    });
    Ok(ToolCall::single(RequestDescriptor::post(
        "/v1/appStoreVersions",
        body,
    )))
}

fn build_update_app_store_version(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let version_id = required_id(args, "version_id")?;

    let mut attributes = Map::new();
    for key in ["versionString", "copyright", "earliestReleaseDate"] {
        if let Some(value) = arg_present_string(args, key)? {
            attributes.insert(key.to_string(), Value::String(value));
        }
    }
    if let Some(release_type) = arg_optional_enum(args, "releaseType", RELEASE_TYPES)? {
        attributes.insert("releaseType".to_string(), Value::String(release_type));
    }

    let body = json!({
        "data": {
            "type": "appStoreVersions",
            "id": version_id,
            "attributes": attributes
        }
    });
    Ok(ToolCall::single(RequestDescriptor::patch(
        format!("/v1/appStoreVersions/{version_id}"),
        body,
    )))
}

fn build_list_version_localizations(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let version_id = required_id(args, "version_id")?;
    ToolCall::list(
        args,
        format!("/v1/appStoreVersions/{version_id}/appStoreVersionLocalizations"),
        QueryParams::new(),
    )
}

fn build_get_version_localization(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let localization_id = required_id(args, "localization_id")?;
    Ok(ToolCall::single(RequestDescriptor::get(format!(
        "/v1/appStoreVersionLocalizations/{localization_id}"
    ))))
}

/// Present text attributes, empty strings included.
fn localization_attributes(
    args: &ToolArgs,
    mut attributes: Map<String, Value>,
) -> Result<Map<String, Value>, ToolError> {
    for key in LOCALIZATION_TEXT_FIELDS {
        if let Some(value) = arg_present_string(args, key)? {
            attributes.insert(key.to_string(), Value::String(value));
        }
    }
    Ok(attributes)
}

fn build_create_version_localization(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let version_id = required_string(args, "version_id")?;
    let locale = required_string(args, "locale")?;
    let attributes = localization_attributes(
        args,
        Map::from_iter([("locale".to_string(), Value::String(locale))]),
    )?;

    let body = json!({
        "data": {
            "type": "appStoreVersionLocalizations",
            "attributes": attributes,
            "relationships": {
                "appStoreVersion": linkage("appStoreVersions", &version_id)
            }
        }
    });
    Ok(ToolCall::single(RequestDescriptor::post(
        "/v1/appStoreVersionLocalizations",
        body,
    )))
}

fn build_update_version_localization(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let localization_id = required_id(args, "localization_id")?;
    let attributes = localization_attributes(args, Map::new())?;

    let body = json!({
        "data": {
            "type": "appStoreVersionLocalizations",
            "id": localization_id,
            "attributes": attributes
        }
    });
    Ok(ToolCall::single(RequestDescriptor::patch(
        format!("/v1/appStoreVersionLocalizations/{localization_id}"),
        body,
    )))
}

fn build_list_builds(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let app_id = required_string(args, "app_id")?;
    let mut params = QueryParams::new();
    params
        .set("filter[app]", app_id)
        .set_opt("filter[version]", arg_optional_string(args, "filter_version")?)
        .set_opt(
            "filter[processingState]",
            arg_optional_enum(args, "filter_processingState", BUILD_PROCESSING_STATES)?,
        )
        .set_opt(
            "filter[expired]",
            arg_optional_bool(args, "filter_expired")?.map(|expired| expired.to_string()),
        )
        .set_opt("include", arg_optional_string(args, "include")?)
        .set_opt("sort", arg_optional_string(args, "sort")?);
    ToolCall::list(args, "/v1/builds".to_string(), params)
}

fn build_add_build_to_beta_group(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let beta_group_id = required_id(args, "beta_group_id")?;
    let build_ids = required_string_array(args, "build_ids")?;

    let data: Vec<Value> = build_ids
        .iter()
        .map(|id| json!({ "type": "builds", "id": id }))
        .collect();
    let message = format!(
        "Added {} build(s) to beta group {beta_group_id}",
        build_ids.len()
    );
    Ok(ToolCall::acknowledge(
        RequestDescriptor::post(
            format!("/v1/betaGroups/{beta_group_id}/relationships/builds"),
            json!({ "data": data }),
        ),
        message,
    ))
}

fn build_list_bundle_ids(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let mut params = QueryParams::new();
    params
        .set_opt("filter[identifier]", arg_optional_string(args, "filter_identifier")?)
        .set_opt("filter[name]", arg_optional_string(args, "filter_name")?)
        .set_opt(
            "filter[platform]",
            arg_optional_enum(args, "filter_platform", BUNDLE_ID_PLATFORMS)?,
        )
        .set_opt("include", arg_optional_string(args, "include")?);
    ToolCall::list(args, "/v1/bundleIds".to_string(), params)
}

fn build_register_bundle_id(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let name = required_string(args, "name")?;
    let identifier = required_string(args, "identifier")?;
    let platform = required_enum(args, "platform", BUNDLE_ID_PLATFORMS)?;

    let body = json!({
        "data": {
            "type": "bundleIds",
            "attributes": {
                "name": name,
                "identifier": identifier,
                "platform": platform
            }
        }
    });
    Ok(ToolCall::single(RequestDescriptor::post("/v1/bundleIds", body)))
}

fn build_list_bundle_id_capabilities(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let bundle_id = required_id(args, "bundle_id")?;
    ToolCall::list(
        args,
        format!("/v1/bundleIds/{bundle_id}/bundleIdCapabilities"),
        QueryParams::new(),
    )
}

fn build_enable_bundle_id_capability(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let bundle_id = required_string(args, "bundle_id")?;
    let capability_type = required_string(args, "capabilityType")?;

    let body = json!({
        "data": {
            "type": "bundleIdCapabilities",
            "attributes": {
                "capabilityType": capability_type
            },
            "relationships": {
                "bundleId": linkage("bundleIds", &bundle_id)
            }
        }
    });
    Ok(ToolCall::single(RequestDescriptor::post(
        "/v1/bundleIdCapabilities",
        body,
    )))
}

fn build_disable_bundle_id_capability(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let capability_id = required_id(args, "capability_id")?;
    Ok(ToolCall::acknowledge(
        RequestDescriptor::delete(format!("/v1/bundleIdCapabilities/{capability_id}")),
        format!("Capability {capability_id} disabled"),
    ))
}

fn build_create_app_store_version_submission(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let version_id = required_string(args, "version_id")?;
    let body = json!({
        "data": {
            "type": "appStoreVersionSubmissions",
            "relationships": {
                "appStoreVersion": linkage("appStoreVersions", &version_id)
            }
        }
    });
    Ok(ToolCall::single(RequestDescriptor::post(
        "/v1/appStoreVersionSubmissions",
        body,
    )))
}

fn build_list_users(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let mut params = QueryParams::new();
    params
        .set_opt("filter[roles]", arg_optional_string(args, "filter_roles")?)
        .set_opt("filter[username]", arg_optional_string(args, "filter_username")?)
        .set_opt("include", arg_optional_string(args, "include")?);
    ToolCall::list(args, "/v1/users".to_string(), params)
}

fn build_list_devices(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let mut params = QueryParams::new();
    params
        .set_opt("filter[name]", arg_optional_string(args, "filter_name")?)
        .set_opt(
            "filter[platform]",
            arg_optional_enum(args, "filter_platform", DEVICE_PLATFORMS)?,
        )
        .set_opt(
            "filter[status]",
            arg_optional_enum(args, "filter_status", DEVICE_STATUSES)?,
        )
        .set_opt("filter[udid]", arg_optional_string(args, "filter_udid")?);
    ToolCall::list(args, "/v1/devices".to_string(), params)
}

fn build_api_request(args: &ToolArgs) -> Result<ToolCall, ToolError> {
    let method: ApiMethod = required_enum(args, "method", API_METHODS)?
        .parse()
        .map_err(|err: asc_core::client::UnsupportedMethod| {
            ToolError::validation(err.to_string()).with_field("method")
        })?;
    let path = normalize_api_path(&required_string(args, "path")?)?;
    let params = parse_query_params(args.get("params"), "params")?;

    let body = match args.get("body") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) if raw.trim().is_empty() => None,
        Some(Value::String(raw)) => Some(serde_json::from_str::<Value>(raw).map_err(|err| {
            ToolError::validation(format!("'body' is not valid JSON: {err}")).with_field("body")
        })?),
        Some(Value::Object(_)) => args.get("body").cloned(),
        Some(_) => {
            return Err(ToolError::validation("'body' must be a JSON string").with_field("body"));
        }
    };

    let mut request = RequestDescriptor::new(method, path).with_params(params);
    request.body = body;
    Ok(ToolCall::single(request))
}
