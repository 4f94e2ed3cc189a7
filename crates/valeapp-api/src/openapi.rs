// SPDX-License-Identifier: Apache-2.0

use crate::ApiErrorCode;
use serde_json::{json, Value};

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiErrorEnvelope"}}}
    })
}

fn secured(mut op: Value) -> Value {
    op["security"] = json!([{"bearer": []}]);
    op["responses"]["401"] = error_response("missing or expired session");
    op
}

fn admin(op: Value) -> Value {
    let mut op = secured(op);
    op["responses"]["403"] = error_response("admin session required");
    op
}

/// Machine-readable description of every route the server mounts.
#[must_use]
pub fn openapi_v1_spec() -> Value {
    let codes: Vec<&str> = ApiErrorCode::ALL.iter().map(|c| c.as_str()).collect();
    json!({
      "openapi": "3.0.3",
      "info": {"title": "valeapp API", "version": crate::API_VERSION},
      "paths": {
        "/healthz": {"get": {"responses": {"200": {"description": "ok"}}}},
        "/readyz": {"get": {"responses": {"200": {"description": "store reachable"}, "503": error_response("store unreachable")}}},
        "/v1/auth/admin/login": {"post": {"responses": {"200": {"description": "session issued"}, "401": error_response("unknown login or wrong password")}}},
        "/v1/auth/employee/login": {"post": {"responses": {"200": {"description": "session issued or password setup required"}, "401": error_response("unknown cpf or wrong password")}}},
        "/v1/auth/employee/password": {"post": {"responses": {"200": {"description": "password stored, session issued"}, "401": error_response("invalid ticket"), "422": error_response("password must be 6 digits")}}},
        "/v1/auth/logout": {"post": secured(json!({"responses": {"204": {"description": "session revoked"}}}))},
        "/v1/auth/session": {"get": secured(json!({"responses": {"200": {"description": "current session"}}}))},
        "/v1/justification-kinds": {"get": {"responses": {"200": {"description": "closed list of justification reasons"}}}},
        "/v1/vouchers": {"get": secured(json!({
          "parameters": [
            {"name": "search", "in": "query", "schema": {"type": "string"}},
            {"name": "status", "in": "query", "schema": {"type": "string", "enum": ["all", "pending", "justified"]}}
          ],
          "responses": {"200": {"description": "vouchers with stats"}, "400": error_response("invalid query")}
        }))},
        "/v1/vouchers/{key}/justify": {"post": secured(json!({
          "responses": {
            "200": {"description": "voucher justified"},
            "403": error_response("not the owning employee"),
            "404": error_response("unknown voucher"),
            "409": error_response("already justified"),
            "422": error_response("invalid form")
          }
        }))},
        "/v1/admin/stats": {"get": admin(json!({"responses": {"200": {"description": "global stats"}}}))},
        "/v1/admin/vouchers/import": {"post": admin(json!({"responses": {"200": {"description": "batch inserted"}, "413": error_response("workbook too large"), "422": error_response("workbook rejected")}}))},
        "/v1/admin/cleanup": {"post": admin(json!({"responses": {"200": {"description": "archived and purged"}, "400": error_response("confirmation missing")}}))},
        "/v1/admin/export/{dataset}": {"get": admin(json!({"responses": {"200": {"description": "xlsx workbook"}}}))},
        "/v1/admin/employees": {
          "get": admin(json!({"responses": {"200": {"description": "employees"}}})),
          "post": admin(json!({"responses": {"201": {"description": "employee created"}, "409": error_response("duplicate cpf or promax")}}))
        },
        "/v1/admin/admins": {
          "get": admin(json!({"responses": {"200": {"description": "admins"}}})),
          "post": admin(json!({"responses": {"201": {"description": "admin created"}, "409": error_response("duplicate login")}}))
        }
      },
      "components": {
        "securitySchemes": {"bearer": {"type": "http", "scheme": "bearer"}},
        "schemas": {
          "ApiErrorCode": {"type": "string", "enum": codes},
          "ApiError": {
            "type": "object",
            "required": ["code", "message", "details"],
            "additionalProperties": false,
            "properties": {
              "code": {"$ref": "#/components/schemas/ApiErrorCode"},
              "message": {"type": "string"},
              "details": {"type": "object"}
            }
          },
          "ApiErrorEnvelope": {
            "type": "object",
            "required": ["error"],
            "properties": {"error": {"$ref": "#/components/schemas/ApiError"}}
          }
        }
      }
    })
}
